//! Line-oriented event loop over a [`Session`].
//!
//! Each `set` command is one UI event and triggers one full render pass.
//! Commands:
//!
//! ```text
//! set KEY VALUE   change a control and re-render
//! pass            re-render without changing anything
//! controls        list the controls drawn in the last pass
//! show            list the images shown in the last successful pass
//! state           print the remembered control state as JSON
//! help            list commands
//! quit            leave (end of input works too)
//! ```

use std::io::{BufRead, Write};

use stagehand_pipeline::ControlValue;

use crate::error::CliError;
use crate::session::Session;

const HELP: &str = "commands: set KEY VALUE | pass | controls | show | state | help | quit";

/// What the loop should do after a pass succeeded.
pub trait PassSink {
    /// Called with the session after every successful pass.
    ///
    /// # Errors
    ///
    /// Whatever handling the pass output fails with; reported and the loop
    /// continues.
    fn passed(&mut self, session: &Session) -> Result<(), CliError>;
}

impl<F> PassSink for F
where
    F: FnMut(&Session) -> Result<(), CliError>,
{
    fn passed(&mut self, session: &Session) -> Result<(), CliError> {
        self(session)
    }
}

/// One parsed input line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Command {
    Set(String, ControlValue),
    Pass,
    Controls,
    Show,
    State,
    Help,
    Quit,
    Blank,
    Unknown(String),
}

impl Command {
    fn parse(line: &str) -> Self {
        let line = line.trim();
        let mut words = line.splitn(3, char::is_whitespace);
        match (words.next(), words.next(), words.next()) {
            (None | Some(""), ..) => Self::Blank,
            (Some("set"), Some(key), Some(value)) => {
                Self::Set(key.to_string(), ControlValue::parse(value))
            }
            (Some("pass"), None, None) => Self::Pass,
            (Some("controls"), None, None) => Self::Controls,
            (Some("show"), None, None) => Self::Show,
            (Some("state"), None, None) => Self::State,
            (Some("help"), None, None) => Self::Help,
            (Some("quit" | "exit"), None, None) => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

/// Run one pass and report it; failures are printed, not returned.
fn render<W: Write, S: PassSink>(session: &mut Session, sink: &mut S, out: &mut W) -> std::io::Result<()> {
    match session.pass() {
        Ok(pass) => {
            writeln!(out, "ok: {}", pass.frame.describe())?;
            if let Err(e) = sink.passed(session) {
                writeln!(out, "Error: {e}")?;
            }
        }
        Err(e) => {
            tracing::warn!(error = %e, "render pass failed; keeping previous output");
            writeln!(out, "Error: {e}")?;
        }
    }
    Ok(())
}

/// Drive `session` from `input` until `quit` or end of input.
///
/// An initial pass runs before the first command is read.
///
/// # Errors
///
/// Returns [`CliError::Io`] if reading commands or writing responses
/// fails.
pub fn run<R, W, S>(session: &mut Session, input: R, out: &mut W, sink: &mut S) -> Result<(), CliError>
where
    R: BufRead,
    W: Write,
    S: PassSink,
{
    let io = |e| CliError::io("<stdio>", e);
    render(session, sink, out).map_err(io)?;
    for line in input.lines() {
        let line = line.map_err(io)?;
        match Command::parse(&line) {
            Command::Set(key, value) => {
                tracing::debug!(key = %key, value = %value, "control changed");
                session.set(key, value);
                render(session, sink, out).map_err(io)?;
            }
            Command::Pass => render(session, sink, out).map_err(io)?,
            Command::Controls => {
                writeln!(out, "{}", crate::output::describe_widgets(session.ui().widgets())).map_err(io)?;
            }
            Command::Show => match session.last() {
                Some(pass) => {
                    writeln!(out, "{}", crate::output::describe_panels(&pass.panels)).map_err(io)?;
                }
                None => writeln!(out, "no successful pass yet").map_err(io)?,
            },
            Command::State => {
                let json = serde_json::to_string_pretty(session.ui().state())?;
                writeln!(out, "{json}").map_err(io)?;
            }
            Command::Help => writeln!(out, "{HELP}").map_err(io)?,
            Command::Quit => break,
            Command::Blank => {}
            Command::Unknown(text) => writeln!(out, "unknown command `{text}`; {HELP}").map_err(io)?,
        }
        out.flush().map_err(io)?;
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use stagehand_pipeline::{ColorCatalog, ControlState, DynamicImage, Frame};

    use super::*;
    use crate::session::PipelineSource;

    fn session() -> Session {
        let source = Frame::from(DynamicImage::ImageRgb8(image::RgbImage::from_fn(24, 24, |x, _| {
            if x < 12 {
                image::Rgb([0, 0, 0])
            } else {
                image::Rgb([200, 200, 200])
            }
        })));
        let pipeline = PipelineSource::Reference.build(&ColorCatalog::builtin()).unwrap();
        Session::new(source, pipeline, ControlState::new())
    }

    fn drive(script: &str) -> (String, usize) {
        let mut session = session();
        let mut passes = 0;
        let mut sink = |_: &Session| -> Result<(), CliError> {
            passes += 1;
            Ok(())
        };
        let mut out = Vec::new();
        run(&mut session, script.as_bytes(), &mut out, &mut sink).unwrap();
        (String::from_utf8(out).unwrap(), passes)
    }

    #[test]
    fn parses_commands() {
        assert_eq!(
            Command::parse("set Canny.threshold1 50"),
            Command::Set("Canny.threshold1".into(), ControlValue::Int(50))
        );
        assert_eq!(
            Command::parse("set cvtColor.code COLOR_BGR2GRAY"),
            Command::Set("cvtColor.code".into(), ControlValue::Key("COLOR_BGR2GRAY".into()))
        );
        assert_eq!(Command::parse("  quit "), Command::Quit);
        assert_eq!(Command::parse(""), Command::Blank);
        assert!(matches!(Command::parse("set onlykey"), Command::Unknown(_)));
    }

    #[test]
    fn every_set_triggers_one_pass() {
        let (out, passes) = drive("set dilate.kernel 3\nset Canny.L2gradient true\ncontrols\n");
        assert_eq!(passes, 3);
        assert!(out.contains("dilate.kernel"));
        assert!(out.contains("Canny.L2gradient"));
    }

    #[test]
    fn failed_pass_is_reported_and_loop_continues() {
        let (out, passes) = drive("set cvtColor.code COLOR_GRAY2RGB\nshow\nquit\npass\n");
        assert_eq!(passes, 1);
        assert!(out.contains("Error:"));
        assert!(out.contains("Uploaded Image"));
    }

    #[test]
    fn unknown_commands_print_help() {
        let (out, _) = drive("frobnicate\n");
        assert!(out.contains("unknown command `frobnicate`"));
    }
}
