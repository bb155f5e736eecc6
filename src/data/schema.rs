//! Expected column contract for shipment tables.

use serde::{Deserialize, Serialize};

/// Default accepted date layouts, tried in order.
pub const DEFAULT_DATE_FORMATS: [&str; 4] = [
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
];

/// Shipment record field a column maps onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    ShipmentId,
    Origin,
    Destination,
    OrderDate,
    PromisedDate,
    ActualDate,
    QuantityShipped,
    QuantityReceived,
    Lane,
}

impl Field {
    pub const ALL: [Field; 9] = [
        Field::ShipmentId,
        Field::Origin,
        Field::Destination,
        Field::OrderDate,
        Field::PromisedDate,
        Field::ActualDate,
        Field::QuantityShipped,
        Field::QuantityReceived,
        Field::Lane,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Field::ShipmentId => "shipment_id",
            Field::Origin => "origin",
            Field::Destination => "destination",
            Field::OrderDate => "order_date",
            Field::PromisedDate => "promised_date",
            Field::ActualDate => "actual_date",
            Field::QuantityShipped => "quantity_shipped",
            Field::QuantityReceived => "quantity_received",
            Field::Lane => "lane",
        }
    }

    pub fn column_type(self) -> ColumnType {
        match self {
            Field::ShipmentId | Field::Origin | Field::Destination | Field::Lane => {
                ColumnType::Text
            }
            Field::OrderDate | Field::PromisedDate | Field::ActualDate => ColumnType::Date,
            Field::QuantityShipped | Field::QuantityReceived => ColumnType::Integer,
        }
    }
}

/// Type a cell must coerce to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Text,
    Date,
    Integer,
}

impl std::fmt::Display for ColumnType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ColumnType::Text => "text",
            ColumnType::Date => "date",
            ColumnType::Integer => "integer",
        };
        f.write_str(name)
    }
}

/// Extra rule applied after type coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Constraint {
    /// Text must not be blank after trimming.
    NonEmpty,
    /// Integer must be >= 0.
    NonNegative,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSpec {
    pub name: String,
    pub field: Field,
    pub column_type: ColumnType,
    pub required: bool,
    pub constraints: Vec<Constraint>,
}

impl ColumnSpec {
    pub fn new(name: impl Into<String>, field: Field) -> Self {
        let column_type = field.column_type();
        let constraints = match column_type {
            ColumnType::Text => vec![Constraint::NonEmpty],
            ColumnType::Integer => vec![Constraint::NonNegative],
            ColumnType::Date => Vec::new(),
        };
        Self {
            name: name.into(),
            field,
            column_type,
            required: true,
            constraints,
        }
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Column names and parsing options, as read from the `[schema]` config section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    pub shipment_id: String,
    pub origin: String,
    pub destination: String,
    pub order_date: String,
    pub promised_date: String,
    pub actual_date: String,
    pub quantity_shipped: String,
    pub quantity_received: String,
    pub lane: String,
    pub order_date_required: bool,
    pub date_formats: Vec<String>,
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            shipment_id: "shipment_id".to_string(),
            origin: "origin".to_string(),
            destination: "destination".to_string(),
            order_date: "order_date".to_string(),
            promised_date: "promised_date".to_string(),
            actual_date: "actual_date".to_string(),
            quantity_shipped: "quantity_shipped".to_string(),
            quantity_received: "quantity_received".to_string(),
            lane: "lane".to_string(),
            order_date_required: false,
            date_formats: DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect(),
        }
    }
}

/// The full column contract handed to the validator.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedSchema {
    pub columns: Vec<ColumnSpec>,
    pub date_formats: Vec<String>,
}

impl Default for ExpectedSchema {
    fn default() -> Self {
        Self::from_config(&SchemaConfig::default())
    }
}

impl ExpectedSchema {
    pub fn from_config(config: &SchemaConfig) -> Self {
        let mut order_date = ColumnSpec::new(&config.order_date, Field::OrderDate);
        if !config.order_date_required {
            order_date = order_date.optional();
        }

        let columns = vec![
            ColumnSpec::new(&config.shipment_id, Field::ShipmentId),
            ColumnSpec::new(&config.origin, Field::Origin),
            ColumnSpec::new(&config.destination, Field::Destination),
            order_date,
            ColumnSpec::new(&config.promised_date, Field::PromisedDate),
            ColumnSpec::new(&config.actual_date, Field::ActualDate),
            ColumnSpec::new(&config.quantity_shipped, Field::QuantityShipped),
            ColumnSpec::new(&config.quantity_received, Field::QuantityReceived),
            ColumnSpec::new(&config.lane, Field::Lane),
        ];

        let date_formats = if config.date_formats.is_empty() {
            DEFAULT_DATE_FORMATS.iter().map(|f| f.to_string()).collect()
        } else {
            config.date_formats.clone()
        };

        Self {
            columns,
            date_formats,
        }
    }

    pub fn column(&self, field: Field) -> Option<&ColumnSpec> {
        self.columns.iter().find(|c| c.field == field)
    }

    pub fn column_name(&self, field: Field) -> Option<&str> {
        self.column(field).map(|c| c.name.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schema_covers_every_field() {
        let schema = ExpectedSchema::default();
        for field in Field::ALL {
            assert!(schema.column(field).is_some(), "missing {field:?}");
        }
        assert!(!schema.column(Field::OrderDate).unwrap().required);
        assert!(schema.column(Field::Lane).unwrap().required);
    }

    #[test]
    fn quantities_are_non_negative_integers() {
        let spec = ColumnSpec::new("qty", Field::QuantityShipped);
        assert_eq!(spec.column_type, ColumnType::Integer);
        assert_eq!(spec.constraints, vec![Constraint::NonNegative]);
    }

    #[test]
    fn renamed_columns_flow_through() {
        let config = SchemaConfig {
            lane: "Route".to_string(),
            order_date_required: true,
            date_formats: Vec::new(),
            ..SchemaConfig::default()
        };
        let schema = ExpectedSchema::from_config(&config);
        assert_eq!(schema.column_name(Field::Lane), Some("Route"));
        assert!(schema.column(Field::OrderDate).unwrap().required);
        assert_eq!(schema.date_formats.len(), DEFAULT_DATE_FORMATS.len());
    }
}
