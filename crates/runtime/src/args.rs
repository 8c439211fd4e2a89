
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgError {
    #[error("Invalid boolean flag: {:?}", .0)]
    InvalidBool(String),
    #[error("Flag -{} is missing an argument", .0)]
    MissingArg(String),
    #[error("Invalid value {:?} for flag -{}", .1, .0)]
    InvalidValue(String, String),
    #[error("Unknown flag -{}", .0)]
    UnknownFlag(String),
    #[error("Unexpected argument {:?}", .0)]
    UnexpectedArg(String),
}

/// Whether argument handling should keep going
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// Stop without error, e.g. after printing help
    Exit,
}

/// Parse a boolean flag; true is "-c" or "-c=true", false is "-c=false"
pub fn parse_flag_optional_bool(value: Option<&str>) -> Result<bool, ArgError> {
    match value {
        None => Ok(true),
        Some("false" | "no") => Ok(false),
        Some("true" | "yes") => Ok(true),
        Some(s) => Err(ArgError::InvalidBool(s.into())),
    }
}

/// Parse a required parameter for an option, either inline or as the next arg
pub fn parse_param(
    flag: &str, args: &mut impl Iterator<Item = String>, inline: Option<&str>
) -> Result<String, ArgError> {
    match inline {
        Some(v) => Ok(v.into()),
        None => args.next().ok_or_else(|| ArgError::MissingArg(flag.into())),
    }
}

/// Like [`parse_param`], then `FromStr` on the value
pub fn parse_value<T: std::str::FromStr>(
    flag: &str, args: &mut impl Iterator<Item = String>, inline: Option<&str>
) -> Result<T, ArgError> {
    let value = parse_param(flag, args, inline)?;
    value.parse().map_err(|_| ArgError::InvalidValue(flag.into(), value))
}

/// Walk `-flag`, `-flag=value`, `-flag value` and positional args.
/// A bare `--` ends flag parsing. The first item is the program name.
pub fn parse_args<I, F, P, E>(
    mut args: I,
    mut handle_flag: F,
    mut handle_pos: P,
) -> Result<Flow, E>
where
    I: Iterator<Item = String>,
    F: FnMut(&str, Option<&str>, &mut I, &str) -> Result<Flow, E>,
    P: FnMut(usize, String) -> Result<Flow, E>,
{
    let mut in_flags = true;
    let mut pos_index = 0;
    let arg0 = args.next().unwrap_or_else(|| "unknown".into());

    while let Some(arg) = args.next() {
        let flow = if in_flags && arg.starts_with('-') && arg.len() > 1 {
            let body = &arg[1..];
            let (flag, inline) = match body.split_once('=') {
                Some((flag, inline)) => (flag, Some(inline)),
                None => (body, None),
            };

            if flag == "-" && inline.is_none() {
                in_flags = false;
                Flow::Continue
            } else {
                handle_flag(flag.trim_start_matches('-'), inline, &mut args, &arg0)?
            }
        } else {
            pos_index += 1;
            handle_pos(pos_index - 1, arg)?
        };
        if flow == Flow::Exit {
            return Ok(Flow::Exit);
        }
    }

    Ok(Flow::Continue)
}
