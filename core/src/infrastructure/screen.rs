//! GNU screen argument shapes and `screen -list` parsing.

use std::path::PathBuf;

use crate::infrastructure::process::CommandSpec;


/// Builds the screen invocations used by the session registry.
#[derive(Debug, Clone)]
pub struct ScreenCommandBuilder {
    bin: PathBuf,
}


impl ScreenCommandBuilder {
    pub fn new(bin: impl Into<PathBuf>) -> Self {
        ScreenCommandBuilder { bin: bin.into() }
    }

    /// `screen -list`
    pub fn list(&self) -> CommandSpec {
        CommandSpec::new(&self.bin).arg("-list")
    }

    /// `screen -dmS <name> <program> <args...>`, started detached.
    pub fn create(&self, name: &str, command: &CommandSpec) -> CommandSpec {
        CommandSpec::new(&self.bin)
            .args(["-dmS", name])
            .args(command.argv())
    }

    /// `screen -S <name> -X quit`
    pub fn quit(&self, name: &str) -> CommandSpec {
        CommandSpec::new(&self.bin).args(["-S", name, "-X", "quit"])
    }
}


/// Extract session names from `screen -list` output.
///
/// Session lines look like `\t1234.cam0\t(Detached)`; the name is everything
/// after the first `.` of the leading `<pid>.<name>` token. Header and footer
/// lines are ignored.
pub fn parse_list_sessions(raw: &str) -> Vec<String> {
    raw.lines()
        .filter_map(|line| {
            let token = line.split_whitespace().next()?;
            let (pid, name) = token.split_once('.')?;
            if pid.is_empty() || !pid.bytes().all(|b| b.is_ascii_digit()) || name.is_empty() {
                return None;
            }
            Some(name.to_string())
        })
        .collect()
}
