
/// Write `error`, then its `source()` chain numbered from 0. Multi-line causes
/// stay indented under their number.
pub fn format_error<W>(f: &mut W, error: &dyn std::error::Error) -> std::fmt::Result where W: std::fmt::Write {
    write!(f, "{}", error)?;

    let mut next_cause = error.source();
    if next_cause.is_some() {
        write!(f, "\n\nCaused by:")?;
    }
    let mut n = 0;
    while let Some(cause) = next_cause {
        write!(f, "\n{:>5}: ", n)?;
        let text = cause.to_string();
        for (i, line) in text.split('\n').enumerate() {
            if i > 0 {
                write!(f, "\n{:7}", "")?;
            }
            f.write_str(line)?;
        }
        next_cause = cause.source();
        n += 1;
    }
    Ok(())
}

/// `Display` adapter around [`format_error`], for log lines and startup failures
pub fn format_error_disp<'a, E>(e: &'a E) -> impl std::fmt::Display + 'a where E: std::error::Error {
    struct Disp<'a, E>(&'a E);
    impl<E> std::fmt::Display for Disp<'_, E> where E: std::error::Error {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            format_error(f, self.0)
        }
    }
    Disp(e)
}
