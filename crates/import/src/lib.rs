pub mod csv;
pub mod error;
pub mod rules;
pub(crate) mod util;
pub mod validate;

pub use self::csv::{is_statement_filename, parse_statement, parse_statement_file, StatementParser};
pub use error::{ImportError, ParseError};
pub use rules::{CategoryRule, CategoryRuleSet, RuleError};
pub use validate::ValidatedBatch;

pub mod import {
    use crate::*;
    use std::path::Path;

    /// Parse then validate one statement export.
    pub fn import_statement<R: std::io::Read>(
        data: R,
        rules: &CategoryRuleSet,
    ) -> Result<ValidatedBatch, ImportError> {
        let batch = parse_statement(data, rules)?;
        ValidatedBatch::validate(&batch)
    }

    pub fn import_statement_file(
        path: &Path,
        rules: &CategoryRuleSet,
    ) -> Result<ValidatedBatch, ImportError> {
        let batch = parse_statement_file(path, rules)?;
        ValidatedBatch::validate(&batch)
    }

    pub fn load_rules(toml_content: Option<&str>) -> Result<CategoryRuleSet, RuleError> {
        match toml_content {
            Some(content) => CategoryRuleSet::from_toml(content),
            None => Ok(CategoryRuleSet::default()),
        }
    }
}
