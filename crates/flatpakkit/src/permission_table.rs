//! Parse `flatpak permission-show` output.

use crate::error::{Error, Result};
use crate::types::PermissionEntry;

/// Parse the tab-separated permission table.
///
/// The first line is a header and is skipped. Columns are
/// `table, object, app, permissions, data`; `data` may be missing.
pub fn parse(content: &str) -> Result<Vec<PermissionEntry>> {
    content
        .lines()
        .skip(1)
        .filter(|line| !line.trim().is_empty())
        .map(parse_row)
        .collect()
}

fn parse_row(line: &str) -> Result<PermissionEntry> {
    let fields: Vec<&str> = line.splitn(5, '\t').collect();
    if fields.len() < 4 {
        return Err(Error::Output {
            command: "flatpak permission-show".to_string(),
            message: format!(
                "expected at least 4 tab-separated fields, found {}",
                fields.len()
            ),
        });
    }

    Ok(PermissionEntry {
        table: fields[0].trim().to_string(),
        object: fields[1].trim().to_string(),
        app: fields[2].trim().to_string(),
        permissions: fields[3].trim().to_string(),
        data: fields
            .get(4)
            .map(|d| d.trim().to_string())
            .unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_table() {
        let content = "Table\tObject\tApp\tPermissions\tData\n\
                       devices\tcamera\torg.gnome.Cheese\tyes\t\n\
                       documents\t5f3a\torg.gnome.Maps\tread,write\t0x00\n";
        let rows = parse(content).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].table, "devices");
        assert_eq!(rows[0].data, "");
        assert_eq!(rows[1].permissions, "read,write");
        assert_eq!(rows[1].data, "0x00");
    }

    #[test]
    fn test_parse_header_only() {
        let header = "Table\tObject\tApp\tPermissions\tData\n";
        assert!(parse(header).unwrap().is_empty());
        assert!(parse("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_missing_data_column() {
        let rows = parse("header\nnotifications\tnotification\torg.app.Foo\tyes\n").unwrap();
        assert_eq!(rows[0].data, "");
    }

    #[test]
    fn test_parse_short_row_fails() {
        assert!(parse("header\nonly\ttwo\n").is_err());
    }
}
