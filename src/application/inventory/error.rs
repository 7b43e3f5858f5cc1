use thiserror::Error;

/// The inventory bytes do not follow the expected layout.
///
/// Keeps the message template apart from its arguments; `{}` placeholders in
/// the template are filled in order when displayed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}", fill_template(.template, .args))]
pub struct InventoryError {
    template: &'static str,
    args: Vec<String>,
}

impl InventoryError {
    pub(crate) fn new(template: &'static str, args: Vec<String>) -> Self {
        Self { template, args }
    }

    pub(crate) fn plain(template: &'static str) -> Self {
        Self::new(template, Vec::new())
    }

    pub fn template(&self) -> &str {
        self.template
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

fn fill_template(template: &str, args: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut args = args.iter();
    let mut pieces = template.split("{}").peekable();
    while let Some(piece) = pieces.next() {
        out.push_str(piece);
        if pieces.peek().is_some() {
            out.push_str(args.next().map(String::as_str).unwrap_or("{}"));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_placeholders_in_order() {
        let err = InventoryError::new(
            "invalid inventory header: {} ({})",
            vec!["# nope".to_string(), "line 1".to_string()],
        );
        assert_eq!(err.to_string(), "invalid inventory header: # nope (line 1)");
        assert_eq!(err.template(), "invalid inventory header: {} ({})");
        assert_eq!(err.args().len(), 2);
    }

    #[test]
    fn missing_arguments_leave_placeholder() {
        let err = InventoryError::plain("value: {}");
        assert_eq!(err.to_string(), "value: {}");
    }
}
