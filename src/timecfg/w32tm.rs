//! Windows Time service utility (`w32tm`): argument vectors and parsing of
//! its configuration dump.
//!
//! `w32tm /query /configuration` prints lines such as:
//!
//! ```text
//! [TimeProviders]
//! NtpServer: time.windows.com,0x9 (Local)
//! Type: NTP (Local)
//! ```

/// Dump key holding the configured peer list.
pub const NTP_SERVER_PROPERTY: &str = "NtpServer";
/// Marks a value resolved from local configuration rather than policy.
pub const LOCAL_SUFFIX: &str = " (Local)";

pub fn query_args() -> Vec<String> {
    vec!["/query".into(), "/configuration".into()]
}

/// Arguments that make `peers` the manual peer list and push the change to
/// the running service.
pub fn config_args(peers: &str) -> Vec<String> {
    vec![
        "/config".into(),
        format!("/manualpeerlist:{peers}"),
        "/syncfromflags:manual".into(),
        "/reliable:yes".into(),
        "/update".into(),
    ]
}

// ── Key-value parser ──────────────────────────────────────────────────────────

/// Splits `name<sep>value` lines.  A line must hold exactly one separator;
/// anything else is skipped.
#[derive(Debug, Clone, Copy)]
pub struct KeyValueParser<'s> {
    pub separator:    char,
    pub strip_suffix: Option<&'s str>,
}

impl KeyValueParser<'static> {
    /// Parser for the `w32tm` configuration dump.
    pub const W32TM: KeyValueParser<'static> = KeyValueParser {
        separator:    ':',
        strip_suffix: Some(LOCAL_SUFFIX),
    };
}

impl<'s> KeyValueParser<'s> {
    pub fn parse_line<'t>(&self, line: &'t str) -> Option<(&'t str, &'t str)> {
        let mut parts = line.split(self.separator);
        let name  = parts.next()?;
        let value = parts.next()?;
        if parts.next().is_some() {
            return None;
        }
        let name  = name.trim_matches(' ');
        let mut value = value.trim_matches(' ');
        if let Some(suffix) = self.strip_suffix {
            value = value.strip_suffix(suffix).unwrap_or(value);
        }
        Some((name, value))
    }

    pub fn pairs<'t>(&'t self, text: &'t str) -> impl Iterator<Item = (&'t str, &'t str)> + 't {
        text.lines().filter_map(move |line| self.parse_line(line))
    }
}

/// Extract the `NtpServer` value from a configuration dump.  The last
/// occurrence wins.
pub fn ntp_server(dump: &str) -> Option<String> {
    KeyValueParser::W32TM
        .pairs(dump)
        .filter(|(name, _)| *name == NTP_SERVER_PROPERTY)
        .map(|(_, value)| value.to_string())
        .last()
}

#[cfg(test)]
mod tests {
    use super::*;

    const DUMP: &str = "[Configuration]\r\n\
        \r\n\
        EventLogFlags: 2 (Local)\r\n\
        AnnounceFlags: 10 (Local)\r\n\
        \r\n\
        [TimeProviders]\r\n\
        NtpClient (Local)\r\n\
        DllName: C:\\WINDOWS\\system32\\w32time.dll (Local)\r\n\
        NtpServer: time.example.com (Local)\r\n\
        Type: NTP (Local)\r\n";

    #[test]
    fn local_suffix_is_stripped() {
        assert_eq!(ntp_server(DUMP).as_deref(), Some("time.example.com"));
    }

    #[test]
    fn lines_without_exactly_one_colon_are_skipped() {
        let p = KeyValueParser::W32TM;
        assert_eq!(p.parse_line("NtpClient (Local)"), None);
        assert_eq!(p.parse_line("DllName: C:\\WINDOWS\\w32time.dll"), None);
        assert_eq!(p.parse_line("LastSync: 10/17/2026 1:02:03 PM"), None);
        // Skipped lines do not disturb the extracted value.
        let dump = "NtpServer: a:b:c\nNtpServer: pool.ntp.org (Local)\nnoise\n";
        assert_eq!(ntp_server(dump).as_deref(), Some("pool.ntp.org"));
    }

    #[test]
    fn surrounding_spaces_are_trimmed() {
        let p = KeyValueParser { separator: '=', strip_suffix: None };
        assert_eq!(p.parse_line("  key  =  v (Local) "), Some(("key", "v (Local)")));
    }

    #[test]
    fn suffix_only_removed_at_end() {
        let p = KeyValueParser::W32TM;
        assert_eq!(p.parse_line("Note: (Local) peer"), Some(("Note", "(Local) peer")));
        assert_eq!(p.parse_line("NtpServer: a,0x9 (Local)"), Some(("NtpServer", "a,0x9")));
    }

    #[test]
    fn missing_property_yields_none() {
        assert_eq!(ntp_server("Type: NT5DS (Local)\n"), None);
        assert_eq!(ntp_server(""), None);
    }

    #[test]
    fn config_keeps_peer_list_in_one_argument() {
        let args = config_args("a.example b.example");
        assert_eq!(args[1], "/manualpeerlist:a.example b.example");
        assert_eq!(args.len(), 5);
        assert_eq!(query_args(), vec!["/query", "/configuration"]);
    }
}
