// SPDX-License-Identifier: Apache-2.0

use chrono::NaiveDateTime;
use std::collections::BTreeMap;
use wavescope_core::{format_iso, format_sql_timestamp};

/// A named value bound into the candidate query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SqlParam {
    Timestamp(NaiveDateTime),
    Text(String),
}

impl SqlParam {
    /// Value handed to SQLite.
    #[must_use]
    pub fn bound_text(&self) -> String {
        match self {
            Self::Timestamp(ts) => format_sql_timestamp(ts),
            Self::Text(s) => s.clone(),
        }
    }

    /// Value reported in diagnostics.
    #[must_use]
    pub fn display(&self) -> String {
        match self {
            Self::Timestamp(ts) => format_iso(ts),
            Self::Text(s) => s.clone(),
        }
    }

    #[must_use]
    pub fn literal(&self) -> String {
        quote_literal(&self.bound_text())
    }
}

#[must_use]
pub fn quote_literal(raw: &str) -> String {
    format!("'{}'", raw.replace('\'', "''"))
}

/// Inline `:name` placeholders as SQL literals.
///
/// Longer names are substituted first so that `:t10` is never clobbered by
/// `:t1`. A placeholder only matches when followed by a non-word character.
#[must_use]
pub fn expand_sql(sql: &str, params: &BTreeMap<String, SqlParam>) -> String {
    let mut names: Vec<&String> = params.keys().collect();
    names.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
    let mut out = sql.to_string();
    for name in names {
        if let Some(param) = params.get(name) {
            out = inline_placeholder(&out, name, &param.literal());
        }
    }
    out
}

fn inline_placeholder(sql: &str, name: &str, literal: &str) -> String {
    let needle = format!(":{name}");
    let mut out = String::with_capacity(sql.len());
    let mut rest = sql;
    while let Some(pos) = rest.find(&needle) {
        let after = &rest[pos + needle.len()..];
        let at_boundary = after
            .chars()
            .next()
            .map_or(true, |c| !(c.is_alphanumeric() || c == '_'));
        out.push_str(&rest[..pos]);
        out.push_str(if at_boundary { literal } else { &needle });
        rest = after;
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 9, 8)
            .and_then(|d| d.and_hms_opt(h, m, 0))
            .expect("time")
    }

    #[test]
    fn inlines_named_params_with_word_boundary() {
        let mut params = BTreeMap::new();
        params.insert("t1".to_string(), SqlParam::Timestamp(at(13, 0)));
        params.insert("t10".to_string(), SqlParam::Text("x".to_string()));
        params.insert("pat".to_string(), SqlParam::Text("%CH7@%".to_string()));
        let got = expand_sql("a < :t1 AND b = :t10 AND f LIKE :pat AND c = :t1x", &params);
        assert_eq!(
            got,
            "a < '2025-09-08 13:00:00' AND b = 'x' AND f LIKE '%CH7@%' AND c = :t1x"
        );
    }

    #[test]
    fn quotes_are_doubled() {
        assert_eq!(quote_literal("O'Brien"), "'O''Brien'");
        assert_eq!(SqlParam::Text("it's".to_string()).literal(), "'it''s'");
    }

    #[test]
    fn timestamps_report_iso_and_bind_sql_text() {
        let p = SqlParam::Timestamp(at(9, 30));
        assert_eq!(p.display(), "2025-09-08T09:30:00");
        assert_eq!(p.bound_text(), "2025-09-08 09:30:00");
    }
}
