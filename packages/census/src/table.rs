//! Parsing of the Census API tabular response format.
//!
//! Responses are a JSON array of arrays whose first row holds the field
//! names:
//!
//! ```text
//! [["B01003_001E","B11001_001E",...,"state","county","tract"],
//!  ["1181","512",...,"11","001","000101"], ...]
//! ```

use site_engine_census_models::{AcsVariable, DemographicRecord, DemographicTable};

/// Raw response rows. Cells can be `null` for suppressed estimates.
pub type AcsRows = Vec<Vec<Option<String>>>;

/// Left-pads a numeric geography code to `width` digits.
fn pad_code(code: &str, width: usize) -> Option<String> {
    let code = code.trim();
    if code.is_empty() || code.len() > width || !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    Some(format!("{code:0>width$}"))
}

/// Converts a header + data rows table into records keyed by GEOID.
///
/// Rows lacking a usable `state`/`county`/`tract` triple are skipped.
/// Columns that are not one of the known [`AcsVariable`]s are ignored, as
/// are `null` cells.
#[must_use]
pub fn parse_acs_table(rows: &AcsRows, survey_year: u16) -> DemographicTable {
    let mut table = DemographicTable::new();

    let Some(header) = rows.first() else {
        return table;
    };

    let column = |name: &str| {
        header
            .iter()
            .position(|h| h.as_deref() == Some(name))
    };

    let (Some(state_idx), Some(county_idx), Some(tract_idx)) =
        (column("state"), column("county"), column("tract"))
    else {
        log::warn!("ACS {survey_year} response is missing state/county/tract columns");
        return table;
    };

    let variables: Vec<(usize, AcsVariable)> = header
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.as_deref()?.parse::<AcsVariable>().ok().map(|v| (i, v)))
        .collect();

    for row in rows.iter().skip(1) {
        let cell = |i: usize| row.get(i).and_then(Option::as_deref);

        let (Some(state), Some(county), Some(tract)) = (
            cell(state_idx).and_then(|s| pad_code(s, 2)),
            cell(county_idx).and_then(|s| pad_code(s, 3)),
            cell(tract_idx).and_then(|s| pad_code(s, 6)),
        ) else {
            continue;
        };

        let geoid = format!("{state}{county}{tract}");

        let values = variables
            .iter()
            .filter_map(|(i, var)| cell(*i).map(|v| (*var, v.to_string())))
            .collect();

        table.insert(
            geoid.clone(),
            DemographicRecord {
                geoid,
                survey_year,
                values,
            },
        );
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(raw: serde_json::Value) -> AcsRows {
        serde_json::from_value(raw).unwrap()
    }

    #[test]
    fn parses_header_and_rows() {
        let data = rows(serde_json::json!([
            ["B01003_001E", "B19013_001E", "NAME", "state", "county", "tract"],
            ["1181", "-666666666", "Census Tract 1.01", "11", "001", "000101"],
            ["2040", null, "Census Tract 2", "11", "001", "000200"]
        ]));

        let table = parse_acs_table(&data, 2022);
        assert_eq!(table.len(), 2);

        let first = &table["11001000101"];
        assert_eq!(first.survey_year, 2022);
        assert_eq!(first.raw(AcsVariable::Population), Some("1181"));
        assert_eq!(first.raw(AcsVariable::MedianHouseholdIncome), Some("-666666666"));
        assert_eq!(first.values.len(), 2);

        let second = &table["11001000200"];
        assert_eq!(second.raw(AcsVariable::MedianHouseholdIncome), None);
    }

    #[test]
    fn pads_unpadded_geography_codes() {
        let data = rows(serde_json::json!([
            ["B01003_001E", "state", "county", "tract"],
            ["10", "6", "37", "1234"]
        ]));
        let table = parse_acs_table(&data, 2017);
        assert!(table.contains_key("06037001234"));
    }

    #[test]
    fn skips_rows_without_geography() {
        let data = rows(serde_json::json!([
            ["B01003_001E", "state", "county", "tract"],
            ["10", "11", null, "000100"],
            ["10", "11"]
        ]));
        assert!(parse_acs_table(&data, 2022).is_empty());
    }

    #[test]
    fn empty_or_headerless_tables() {
        assert!(parse_acs_table(&Vec::new(), 2022).is_empty());
        let data = rows(serde_json::json!([["B01003_001E"], ["10"]]));
        assert!(parse_acs_table(&data, 2022).is_empty());
    }
}
