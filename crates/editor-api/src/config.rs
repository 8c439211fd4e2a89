use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use editor_html::{Locale, PasteOptions};
use runtime::args::{parse_args, parse_flag_optional_bool, parse_param, parse_value, ArgError, Flow};

pub const USAGE: &str = "\
usage: editor-api [-config <file.yaml>] [-bind <addr:port>] [-locale he|en] [-help]

  -config   YAML file with bind, locale and paste settings (re-read on SIGHUP)
  -bind     address to listen on (default 127.0.0.1:8040)
  -locale   language of user-facing error messages (default he)
";

#[derive(Debug, Clone, PartialEq, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub bind: SocketAddr,
    pub locale: Locale,
    pub paste: PasteOptions,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            bind: SocketAddr::from(([127, 0, 0, 1], 8040)),
            locale: Locale::default(),
            paste: PasteOptions::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not read config file")]
    Read(#[from] std::io::Error),
    #[error("Invalid config file")]
    Parse(#[from] serde_yaml::Error),
    #[error(transparent)]
    Args(#[from] ArgError),
}

pub fn load(path: &Path) -> Result<Config, ConfigError> {
    let text = fs_err::read_to_string(path)?;
    Ok(serde_yaml::from_str(&text)?)
}

/// Command line flags; these win over the config file
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Options {
    pub config_path: Option<PathBuf>,
    pub bind: Option<SocketAddr>,
    pub locale: Option<Locale>,
}

impl Options {
    /// Read the config file (if any) and apply flag overrides
    pub fn resolve(&self) -> Result<Config, ConfigError> {
        let mut config = match &self.config_path {
            Some(path) => load(path)?,
            None => Config::default(),
        };
        if let Some(bind) = self.bind {
            config.bind = bind;
        }
        if let Some(locale) = self.locale {
            config.locale = locale;
        }
        Ok(config)
    }
}

/// Returns `None` when the program should exit (help was printed)
pub fn parse_options(args: impl Iterator<Item = String>) -> Result<Option<Options>, ConfigError> {
    let mut options = Options::default();
    let flow = parse_args(
        args,
        |flag, inline, rest, arg0| -> Result<Flow, ConfigError> {
            match flag {
                "config" | "c" => options.config_path = Some(parse_param(flag, rest, inline)?.into()),
                "bind" | "b" => options.bind = Some(parse_value(flag, rest, inline)?),
                "locale" => options.locale = Some(parse_value(flag, rest, inline)?),
                "help" | "h" => {
                    if parse_flag_optional_bool(inline)? {
                        print!("{}", USAGE.replacen("editor-api", arg0, 1));
                        return Ok(Flow::Exit);
                    }
                },
                _ => return Err(ArgError::UnknownFlag(flag.into()).into()),
            }
            Ok(Flow::Continue)
        },
        |_, arg| -> Result<Flow, ConfigError> { Err(ArgError::UnexpectedArg(arg).into()) },
    )?;

    Ok(match flow {
        Flow::Continue => Some(options),
        Flow::Exit => None,
    })
}
