//! Version information

pub const CURRENT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub fn format_version_info() -> String {
    format!("ticketdesk v{}", CURRENT_VERSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_version_info() {
        assert_eq!(
            format_version_info(),
            format!("ticketdesk v{}", env!("CARGO_PKG_VERSION"))
        );
    }
}
