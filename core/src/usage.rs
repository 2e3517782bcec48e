//! Read-only usage snapshot for renderers.

use serde::Serialize;

use crate::model::{CommandRecord, OptionModel, OptionRecord};

/// One option or the parameter, as shown in usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OptionUsage {
    pub names: Vec<String>,
    pub args: Vec<String>,
    pub description: Option<String>,
    pub hidden: bool,
}

impl OptionUsage {
    fn from_record(record: &OptionRecord) -> Self {
        Self {
            names: record.names().to_vec(),
            args: record.args().to_vec(),
            description: record.description().map(str::to_string),
            hidden: record.is_hidden(),
        }
    }

    /// Names and argument labels joined for display (`-o,--out FILE`).
    pub fn signature(&self) -> String {
        let mut line = self.names.join(",");
        for arg in &self.args {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(arg);
        }
        line
    }
}

/// One command, as shown in usage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommandUsage {
    pub names: Vec<String>,
    pub description: Option<String>,
    pub hidden: bool,
    /// The command's own options and parameter.
    pub options: Vec<OptionUsage>,
    pub parameter: Option<OptionUsage>,
}

impl CommandUsage {
    fn from_record(record: &CommandRecord) -> Self {
        let model = record.model();
        Self {
            names: record.names().to_vec(),
            description: record.description().map(str::to_string),
            hidden: record.is_hidden(),
            options: model.options().iter().map(OptionUsage::from_record).collect(),
            parameter: model.parameter().map(OptionUsage::from_record),
        }
    }

    pub fn visible_options(&self) -> impl Iterator<Item = &OptionUsage> {
        self.options.iter().filter(|o| !o.hidden)
    }
}

/// Everything a renderer needs to print usage for one command level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UsageModel {
    pub program_name: Option<String>,
    pub about_line: Option<String>,
    pub options: Vec<OptionUsage>,
    pub commands: Vec<CommandUsage>,
    pub parameter: Option<OptionUsage>,
}

impl UsageModel {
    pub(crate) fn new(
        model: &OptionModel,
        program_name: Option<String>,
        about_line: Option<String>,
    ) -> Self {
        Self {
            program_name,
            about_line,
            options: model.options().iter().map(OptionUsage::from_record).collect(),
            commands: model.commands().iter().map(CommandUsage::from_record).collect(),
            parameter: model.parameter().map(OptionUsage::from_record),
        }
    }

    pub fn visible_options(&self) -> impl Iterator<Item = &OptionUsage> {
        self.options.iter().filter(|o| !o.hidden)
    }

    pub fn visible_commands(&self) -> impl Iterator<Item = &CommandUsage> {
        self.commands.iter().filter(|c| !c.hidden)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signature() {
        let option = OptionUsage {
            names: vec!["-D".to_string(), "--define".to_string()],
            args: vec!["KEY".to_string(), "VALUE".to_string()],
            description: None,
            hidden: false,
        };
        assert_eq!(option.signature(), "-D,--define KEY VALUE");

        let parameter = OptionUsage {
            names: Vec::new(),
            args: vec!["FILE".to_string()],
            description: None,
            hidden: false,
        };
        assert_eq!(parameter.signature(), "FILE");
    }
}
