use console::{Style, Term};

use crate::cli::GlobalOpts;
use crate::diagnostic;
use crate::error::CliError;

/// Output format mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

/// How results and messages reach the terminal.
///
/// Data goes to stdout; everything else goes to stderr so `--format json`
/// output can be piped.
pub struct OutputContext {
    pub mode: OutputMode,
    pub quiet: bool,
    pub use_color: bool,
}

impl OutputContext {
    /// Construct from global CLI options.
    pub fn from_global(global: &GlobalOpts) -> Self {
        let mode = match global.format.as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        };

        let use_color = !global.no_color
            && std::env::var("TERM").map_or(true, |t| t != "dumb")
            && Term::stderr().is_term();

        Self {
            mode,
            quiet: global.quiet,
            use_color,
        }
    }

    /// `label` in `style` when color is on, plain otherwise.
    fn tag(&self, label: &str, style: Style) -> String {
        if self.use_color {
            style.apply_to(label).to_string()
        } else {
            label.to_string()
        }
    }

    fn human_only(&self) -> bool {
        !self.quiet && self.mode == OutputMode::Human
    }

    /// `ok <msg>` on stderr.
    pub fn success(&self, msg: &str) {
        if self.human_only() {
            eprintln!("{} {msg}", self.tag("ok", Style::new().green().bold()));
        }
    }

    /// `FAIL <msg>` on stderr.
    pub fn failure(&self, msg: &str) {
        if self.human_only() {
            eprintln!("{} {msg}", self.tag("FAIL", Style::new().red().bold()));
        }
    }

    pub fn warn(&self, msg: &str) {
        if self.quiet {
            return;
        }
        match self.mode {
            OutputMode::Human => {
                eprintln!("{} {msg}", self.tag("warning:", Style::new().yellow().bold()));
            }
            OutputMode::Json => eprintln!("{}", serde_json::json!({ "warning": msg })),
            OutputMode::Plain => eprintln!("warning\t{msg}"),
        }
    }

    /// Errors print even in quiet mode. TOML errors get a source snippet in
    /// human mode.
    pub fn print_error(&self, err: &CliError) {
        match self.mode {
            OutputMode::Human => {
                if let CliError::Toml {
                    file,
                    source_text,
                    message,
                    span,
                } = err
                {
                    let report = diagnostic::render(
                        message,
                        span.clone(),
                        source_text,
                        &file.display().to_string(),
                    );
                    eprintln!("{report:?}");
                }
                eprintln!("{} {err}", self.tag("error:", Style::new().red().bold()));
            }
            OutputMode::Json => eprintln!("{}", err.to_json()),
            OutputMode::Plain => eprintln!("error\t{err}"),
        }
    }

    /// Print JSON data to stdout.
    pub fn print_json(&self, value: &serde_json::Value) {
        if let Ok(s) = serde_json::to_string_pretty(value) {
            println!("{s}");
        }
    }

    /// Unadorned line on stderr.
    pub fn status(&self, msg: &str) {
        if self.human_only() {
            eprintln!("{msg}");
        }
    }

    /// Spinners only draw on an interactive stderr in human mode.
    pub fn show_progress(&self) -> bool {
        self.human_only() && Term::stderr().is_term()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_global(format: &str, verbose: u8, quiet: bool, no_color: bool) -> GlobalOpts {
        GlobalOpts {
            config: None,
            format: format.into(),
            verbose,
            quiet,
            no_color,
        }
    }

    #[test]
    fn from_global_human_mode() {
        let global = make_global("human", 0, false, false);
        let ctx = OutputContext::from_global(&global);
        assert_eq!(ctx.mode, OutputMode::Human);
        assert!(!ctx.quiet);
    }

    #[test]
    fn from_global_json_mode() {
        let global = make_global("json", 0, false, false);
        let ctx = OutputContext::from_global(&global);
        assert_eq!(ctx.mode, OutputMode::Json);
    }

    #[test]
    fn from_global_plain_mode() {
        let global = make_global("plain", 2, false, false);
        let ctx = OutputContext::from_global(&global);
        assert_eq!(ctx.mode, OutputMode::Plain);
    }

    #[test]
    fn from_global_no_color_disables_color() {
        let global = make_global("human", 0, false, true);
        let ctx = OutputContext::from_global(&global);
        assert!(!ctx.use_color);
    }

    #[test]
    fn from_global_quiet_flag() {
        let global = make_global("human", 0, true, false);
        let ctx = OutputContext::from_global(&global);
        assert!(ctx.quiet);
    }

    #[test]
    fn show_progress_false_when_quiet() {
        let ctx = OutputContext {
            mode: OutputMode::Human,
            quiet: true,
            use_color: true,
        };
        assert!(!ctx.show_progress());
    }

    #[test]
    fn tag_is_plain_without_color() {
        let ctx = OutputContext {
            mode: OutputMode::Human,
            quiet: false,
            use_color: false,
        };
        assert_eq!(ctx.tag("ok", Style::new().green()), "ok");
    }

    #[test]
    fn show_progress_false_when_json() {
        let ctx = OutputContext {
            mode: OutputMode::Json,
            quiet: false,
            use_color: true,
        };
        assert!(!ctx.show_progress());
    }
}
