//! Schema Validator Module
//! Checks a shipment table against the expected column contract and converts
//! rows into typed records. Every violation is collected before reporting.

use crate::data::schema::{ColumnSpec, ColumnType, Constraint, ExpectedSchema, Field};
use crate::data::{ShipmentRecord, ShipmentTable};
use chrono::{NaiveDate, NaiveDateTime};
use polars::prelude::StringChunked;
use rayon::prelude::*;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

/// A single problem with the input. `row` is `None` for schema-level problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationError {
    pub row: Option<usize>,
    pub column: String,
    pub reason: String,
}

impl ValidationError {
    pub fn schema(column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            row: None,
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn cell(row: usize, column: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            row: Some(row),
            column: column.into(),
            reason: reason.into(),
        }
    }

    pub fn is_schema_level(&self) -> bool {
        self.row.is_none()
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Rows are shown 1-based, counting data rows after the header.
        match self.row {
            Some(row) => write!(f, "row {}, column `{}`: {}", row + 1, self.column, self.reason),
            None => write!(f, "column `{}`: {}", self.column, self.reason),
        }
    }
}

/// Every error found in one validation pass.
#[derive(Error, Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[error("{} validation error(s)", .0.len())]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ValidationError> {
        self.0.iter()
    }

    pub fn schema_errors(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter().filter(|e| e.is_schema_level())
    }

    pub fn into_vec(self) -> Vec<ValidationError> {
        self.0
    }
}

impl<'a> IntoIterator for &'a ValidationErrors {
    type Item = &'a ValidationError;
    type IntoIter = std::slice::Iter<'a, ValidationError>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// A table that passed validation with zero errors, plus its typed rows.
///
/// Only [`SchemaValidator::validate`] can build one.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedTable {
    table: ShipmentTable,
    records: Vec<ShipmentRecord>,
}

impl ValidatedTable {
    /// The original table, unchanged by validation.
    pub fn table(&self) -> &ShipmentTable {
        &self.table
    }

    pub fn records(&self) -> &[ShipmentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn into_table(self) -> ShipmentTable {
        self.table
    }
}

/// Validation failed: the untouched table and every error found.
#[derive(Error, Debug, Clone)]
#[error("shipment table rejected: {errors}")]
pub struct Rejected {
    pub table: ShipmentTable,
    pub errors: ValidationErrors,
}

/// Coerced cell value.
enum Value {
    Text(String),
    Date(NaiveDate),
    Integer(i64),
}

/// Per-row accumulator of coerced values.
#[derive(Default)]
struct RowValues {
    shipment_id: Option<String>,
    origin: Option<String>,
    destination: Option<String>,
    order_date: Option<NaiveDate>,
    promised_date: Option<NaiveDate>,
    actual_date: Option<NaiveDate>,
    quantity_shipped: Option<u64>,
    quantity_received: Option<u64>,
    lane: Option<String>,
}

impl RowValues {
    /// Store a value; quantities that do not fit `u64` are reported back.
    fn set(&mut self, field: Field, value: Value) -> Result<(), String> {
        match (field, value) {
            (Field::ShipmentId, Value::Text(s)) => self.shipment_id = Some(s),
            (Field::Origin, Value::Text(s)) => self.origin = Some(s),
            (Field::Destination, Value::Text(s)) => self.destination = Some(s),
            (Field::Lane, Value::Text(s)) => self.lane = Some(s),
            (Field::OrderDate, Value::Date(d)) => self.order_date = Some(d),
            (Field::PromisedDate, Value::Date(d)) => self.promised_date = Some(d),
            (Field::ActualDate, Value::Date(d)) => self.actual_date = Some(d),
            (Field::QuantityShipped, Value::Integer(n)) => {
                self.quantity_shipped = Some(non_negative(n)?)
            }
            (Field::QuantityReceived, Value::Integer(n)) => {
                self.quantity_received = Some(non_negative(n)?)
            }
            (field, _) => {
                return Err(format!(
                    "column type does not match field {} ({})",
                    field.label(),
                    field.column_type()
                ))
            }
        }
        Ok(())
    }

    /// Fields every record needs that are still empty.
    fn missing(&self) -> Vec<Field> {
        let filled = [
            (Field::ShipmentId, self.shipment_id.is_some()),
            (Field::Origin, self.origin.is_some()),
            (Field::Destination, self.destination.is_some()),
            (Field::PromisedDate, self.promised_date.is_some()),
            (Field::ActualDate, self.actual_date.is_some()),
            (Field::QuantityShipped, self.quantity_shipped.is_some()),
            (Field::QuantityReceived, self.quantity_received.is_some()),
            (Field::Lane, self.lane.is_some()),
        ];
        filled
            .into_iter()
            .filter(|(_, ok)| !ok)
            .map(|(field, _)| field)
            .collect()
    }

    fn into_record(self) -> Option<ShipmentRecord> {
        Some(ShipmentRecord {
            shipment_id: self.shipment_id?,
            origin: self.origin?,
            destination: self.destination?,
            order_date: self.order_date,
            promised_date: self.promised_date?,
            actual_date: self.actual_date?,
            quantity_shipped: self.quantity_shipped?,
            quantity_received: self.quantity_received?,
            lane: self.lane?,
        })
    }
}

fn non_negative(n: i64) -> Result<u64, String> {
    u64::try_from(n).map_err(|_| format!("must be non-negative (got {n})"))
}

/// Accepts plain integers and whole-number decimals such as `10.0`.
/// Exponent forms like `1e3` are not integers here.
fn parse_integer(raw: &str) -> Option<i64> {
    let whole = match raw.split_once('.') {
        Some((whole, fraction)) if !fraction.is_empty() && fraction.bytes().all(|b| b == b'0') => {
            whole
        }
        Some(_) => return None,
        None => raw,
    };
    whole.parse::<i64>().ok()
}

fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    formats.iter().find_map(|format| {
        NaiveDate::parse_from_str(raw, format)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(raw, format).ok().map(|dt| dt.date()))
    })
}

/// Validates shipment tables against an [`ExpectedSchema`].
#[derive(Debug, Clone, Default)]
pub struct SchemaValidator {
    schema: ExpectedSchema,
}

impl SchemaValidator {
    pub fn new(schema: ExpectedSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ExpectedSchema {
        &self.schema
    }

    /// Validate every row and every expected column.
    ///
    /// Required columns missing from the header produce one schema-level error
    /// each; columns not named by the schema are ignored.
    pub fn validate(&self, table: ShipmentTable) -> Result<ValidatedTable, Rejected> {
        let mut errors = self.check_schema_coverage();
        let mut present: Vec<(&ColumnSpec, &StringChunked)> = Vec::new();

        for spec in &self.schema.columns {
            match table.cells(&spec.name) {
                Some(cells) => present.push((spec, cells)),
                None if table.has_column(&spec.name) => errors.push(ValidationError::schema(
                    &spec.name,
                    "column does not contain text cells",
                )),
                None if spec.required => errors.push(ValidationError::schema(
                    &spec.name,
                    "required column is missing",
                )),
                None => {}
            }
        }
        let schema_ok = errors.is_empty();

        let checked: Vec<(Option<ShipmentRecord>, Vec<ValidationError>)> = (0..table.row_count())
            .into_par_iter()
            .map(|row| self.check_row(row, &present, schema_ok))
            .collect();

        let mut records = Vec::with_capacity(checked.len());
        for (record, row_errors) in checked {
            errors.extend(row_errors);
            if let Some(record) = record {
                records.push(record);
            }
        }

        debug!(
            rows = table.row_count(),
            columns = present.len(),
            "validated shipment rows"
        );

        if errors.is_empty() {
            info!(rows = records.len(), "shipment table passed validation");
            Ok(ValidatedTable { table, records })
        } else {
            warn!(errors = errors.len(), "shipment table rejected");
            Err(Rejected {
                table,
                errors: ValidationErrors(errors),
            })
        }
    }

    /// Record fields that no column spec maps onto.
    fn check_schema_coverage(&self) -> Vec<ValidationError> {
        Field::ALL
            .into_iter()
            .filter(|field| *field != Field::OrderDate && self.schema.column(*field).is_none())
            .map(|field| ValidationError::schema(field.label(), "schema has no column for this field"))
            .collect()
    }

    fn check_row(
        &self,
        row: usize,
        present: &[(&ColumnSpec, &StringChunked)],
        build_record: bool,
    ) -> (Option<ShipmentRecord>, Vec<ValidationError>) {
        let mut values = RowValues::default();
        let mut errors = Vec::new();

        for (spec, cells) in present {
            let Some(raw) = cells.get(row) else {
                if spec.required {
                    errors.push(ValidationError::cell(row, &spec.name, "value is missing"));
                }
                continue;
            };

            let coerced = self
                .coerce(spec, raw)
                .and_then(|value| values.set(spec.field, value));
            if let Err(reason) = coerced {
                errors.push(ValidationError::cell(row, &spec.name, reason));
            }
        }

        if let (Some(shipped), Some(received)) = (values.quantity_shipped, values.quantity_received)
        {
            if received > shipped {
                let column = self
                    .schema
                    .column_name(Field::QuantityReceived)
                    .unwrap_or(Field::QuantityReceived.label());
                errors.push(ValidationError::cell(
                    row,
                    column,
                    format!("quantity received ({received}) exceeds quantity shipped ({shipped})"),
                ));
            }
        }

        if !build_record || !errors.is_empty() {
            return (None, errors);
        }

        // Optional column specs can still leave a record field empty.
        for field in values.missing() {
            let column = self.schema.column_name(field).unwrap_or(field.label());
            errors.push(ValidationError::cell(row, column, "value is missing"));
        }
        if !errors.is_empty() {
            return (None, errors);
        }

        (values.into_record(), errors)
    }

    fn coerce(&self, spec: &ColumnSpec, raw: &str) -> Result<Value, String> {
        let trimmed = raw.trim();
        let value = match spec.column_type {
            ColumnType::Text => Value::Text(trimmed.to_string()),
            ColumnType::Date => {
                let date = parse_date(trimmed, &self.schema.date_formats).ok_or_else(|| {
                    format!(
                        "`{trimmed}` is not a valid date (accepted formats: {})",
                        self.schema.date_formats.join(", ")
                    )
                })?;
                Value::Date(date)
            }
            ColumnType::Integer => {
                let n = parse_integer(trimmed)
                    .ok_or_else(|| format!("`{trimmed}` is not an integer"))?;
                Value::Integer(n)
            }
        };

        for constraint in &spec.constraints {
            match (constraint, &value) {
                (Constraint::NonEmpty, Value::Text(s)) if s.is_empty() => {
                    return Err("must not be blank".to_string())
                }
                (Constraint::NonNegative, Value::Integer(n)) if *n < 0 => {
                    return Err(format!("must be non-negative (got {n})"))
                }
                _ => {}
            }
        }

        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::DataLoader;

    const HEADER: &str = "shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received,lane";

    fn table(rows: &[&str]) -> ShipmentTable {
        let mut csv = String::from(HEADER);
        for row in rows {
            csv.push('\n');
            csv.push_str(row);
        }
        DataLoader::default().load_bytes(csv.as_bytes()).unwrap()
    }

    fn validate(t: ShipmentTable) -> Result<ValidatedTable, Rejected> {
        SchemaValidator::default().validate(t)
    }

    #[test]
    fn valid_rows_become_records() {
        let validated = validate(table(&[
            "S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10,A",
            "S2, Oslo ,Trondheim,2024/01/02,2024-01-03T08:30:00,5.0,4,B",
        ]))
        .unwrap();

        assert_eq!(validated.len(), 2);
        let second = &validated.records()[1];
        assert_eq!(second.origin, "Oslo");
        assert_eq!(second.quantity_shipped, 5);
        assert_eq!(second.actual_date, NaiveDate::from_ymd_opt(2024, 1, 3).unwrap());
        assert_eq!(second.order_date, None);
    }

    #[test]
    fn validation_leaves_table_unchanged() {
        let original = table(&["S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10,A"]);
        let validated = validate(original.clone()).unwrap();
        assert_eq!(validated.table(), &original);
    }

    #[test]
    fn missing_column_is_one_schema_error() {
        let csv = "shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received\n\
                   S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10\n\
                   S2,Oslo,Bergen,2024-01-01,2024-01-01,10,10\n\
                   S3,Oslo,Bergen,2024-01-01,2024-01-01,10,10\n";
        let t = DataLoader::default().load_bytes(csv.as_bytes()).unwrap();
        let rejected = validate(t).unwrap_err();

        assert_eq!(rejected.errors.len(), 1);
        let err = rejected.errors.iter().next().unwrap();
        assert!(err.is_schema_level());
        assert_eq!(err.column, "lane");
    }

    #[test]
    fn schema_errors_come_before_cell_errors() {
        let csv = "shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received\n\
                   S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10\n\
                   S2,Oslo,Bergen,2024-13-45,2024-01-01,10,10\n";
        let t = DataLoader::default().load_bytes(csv.as_bytes()).unwrap();
        let rejected = validate(t).unwrap_err();

        let found: Vec<(Option<usize>, &str)> = rejected
            .errors
            .iter()
            .map(|e| (e.row, e.column.as_str()))
            .collect();
        assert_eq!(found, vec![(None, "lane"), (Some(1), "promised_date")]);
    }

    #[test]
    fn integers_accept_whole_decimals_but_not_exponents() {
        assert_eq!(parse_integer("10"), Some(10));
        assert_eq!(parse_integer("10.00"), Some(10));
        assert_eq!(parse_integer("9223372036854775807"), Some(i64::MAX));
        assert_eq!(parse_integer("1e3"), None);
        assert_eq!(parse_integer("1.0e3"), None);
        assert_eq!(parse_integer("10.5"), None);
        assert_eq!(parse_integer("10."), None);

        let rejected = validate(table(&["S1,Oslo,Bergen,2024-01-01,2024-01-01,1e3,10,A"])).unwrap_err();
        let err = rejected.errors.iter().next().unwrap();
        assert_eq!(err.column, "quantity_shipped");
        assert!(err.reason.contains("not an integer"));
    }

    #[test]
    fn collects_every_cell_error() {
        let rejected = validate(table(&[
            "S1,Oslo,Bergen,not-a-date,2024-01-01,10,10,A",
            "S2,Oslo,Bergen,2024-01-01,2024-01-01,-3,x,A",
            "S3,,Bergen,2024-01-01,2024-01-01,4,9,   ",
        ]))
        .unwrap_err();

        let found: Vec<(Option<usize>, &str)> = rejected
            .errors
            .iter()
            .map(|e| (e.row, e.column.as_str()))
            .collect();
        assert_eq!(
            found,
            vec![
                (Some(0), "promised_date"),
                (Some(1), "quantity_shipped"),
                (Some(1), "quantity_received"),
                (Some(2), "origin"),
                (Some(2), "lane"),
                (Some(2), "quantity_received"),
            ]
        );
        assert_eq!(rejected.errors.schema_errors().count(), 0);
    }

    #[test]
    fn extra_columns_are_ignored() {
        let csv = "notes,shipment_id,origin,destination,promised_date,actual_date,quantity_shipped,quantity_received,lane\n\
                   fragile,S1,Oslo,Bergen,2024-01-01,2024-01-01,10,10,A\n";
        let t = DataLoader::default().load_bytes(csv.as_bytes()).unwrap();
        assert_eq!(validate(t).unwrap().len(), 1);
    }

    #[test]
    fn optional_order_date_is_parsed_when_present() {
        let csv = "shipment_id,origin,destination,order_date,promised_date,actual_date,quantity_shipped,quantity_received,lane\n\
                   S1,Oslo,Bergen,2023-12-28,2024-01-01,2024-01-01,10,10,A\n\
                   S2,Oslo,Bergen,,2024-01-01,2024-01-01,10,10,A\n";
        let t = DataLoader::default().load_bytes(csv.as_bytes()).unwrap();
        let validated = validate(t).unwrap();
        assert_eq!(
            validated.records()[0].order_date,
            NaiveDate::from_ymd_opt(2023, 12, 28)
        );
        assert_eq!(validated.records()[1].order_date, None);
    }

    #[test]
    fn error_display_is_one_based() {
        let err = ValidationError::cell(0, "lane", "value is missing");
        assert_eq!(err.to_string(), "row 1, column `lane`: value is missing");
        let err = ValidationError::schema("lane", "required column is missing");
        assert_eq!(err.to_string(), "column `lane`: required column is missing");
    }

    #[test]
    fn integer_parsing_accepts_whole_decimals_only() {
        assert_eq!(parse_integer("12"), Some(12));
        assert_eq!(parse_integer("12.0"), Some(12));
        assert_eq!(parse_integer("12.5"), None);
        assert_eq!(parse_integer("abc"), None);
    }
}
