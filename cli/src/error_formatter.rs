use tenet::TenetError;

/// Format a TenetError for the terminal, expanding rejected candidates
pub fn format_error(error: &TenetError) -> String {
    match error {
        TenetError::NoApplicableFormula {
            component,
            field,
            attempts,
        } => {
            let mut output = format!("No formula can compute '{}' of {}", field, component);
            if attempts.is_empty() {
                output.push_str("\n  The knowledge base is empty");
            }
            for attempt in attempts {
                output.push_str("\n  × ");
                output.push_str(&attempt.to_string());
            }
            output
        }
        TenetError::GroupBounds { .. } | TenetError::Declaration(_) => {
            format!("Invalid model: {}", error)
        }
        _ => format!("Error: {}", error),
    }
}
