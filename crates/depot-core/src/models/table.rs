//! Entity kind identifiers shared with the server

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Stable numeric identifier of a server entity kind.
///
/// The discriminants are the wire values carried by push payloads and stored in
/// the failed-sync queue, so they must never be renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum TableId {
    Product = 1,
    CarBrand = 2,
    CarName = 3,
    CarModel = 4,
    CarVersion = 5,
    Category = 6,
    SubCategory = 7,
    Orders = 8,
    OrderSubs = 9,
    Customers = 10,
    Users = 11,
    Salesmen = 12,
    Units = 13,
    Routes = 14,
    Suppliers = 15,
    OutOfStock = 16,
    OutOfStockSubs = 17,
    Racks = 18,
    Vehicles = 19,
    Deliveries = 20,
    UserCategories = 21,
    /// Broadcast action: force the addressed users to log out.
    Logout = 22,
}

impl TableId {
    pub const ALL: [Self; 22] = [
        Self::Product,
        Self::CarBrand,
        Self::CarName,
        Self::CarModel,
        Self::CarVersion,
        Self::Category,
        Self::SubCategory,
        Self::Orders,
        Self::OrderSubs,
        Self::Customers,
        Self::Users,
        Self::Salesmen,
        Self::Units,
        Self::Routes,
        Self::Suppliers,
        Self::OutOfStock,
        Self::OutOfStockSubs,
        Self::Racks,
        Self::Vehicles,
        Self::Deliveries,
        Self::UserCategories,
        Self::Logout,
    ];

    /// Wire value of this table.
    pub const fn code(self) -> i64 {
        self as i64
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "product",
            Self::CarBrand => "car_brand",
            Self::CarName => "car_name",
            Self::CarModel => "car_model",
            Self::CarVersion => "car_version",
            Self::Category => "category",
            Self::SubCategory => "sub_category",
            Self::Orders => "orders",
            Self::OrderSubs => "order_subs",
            Self::Customers => "customers",
            Self::Users => "users",
            Self::Salesmen => "salesmen",
            Self::Units => "units",
            Self::Routes => "routes",
            Self::Suppliers => "suppliers",
            Self::OutOfStock => "out_of_stock",
            Self::OutOfStockSubs => "out_of_stock_subs",
            Self::Racks => "racks",
            Self::Vehicles => "vehicles",
            Self::Deliveries => "deliveries",
            Self::UserCategories => "user_categories",
            Self::Logout => "logout",
        }
    }

    /// Whether this id names a broadcast action rather than an entity table.
    pub const fn is_action(self) -> bool {
        matches!(self, Self::Logout)
    }
}

impl TryFrom<i64> for TableId {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|table| table.code() == value)
            .ok_or_else(|| Error::InvalidInput(format!("unknown table id {value}")))
    }
}

impl From<TableId> for i64 {
    fn from(value: TableId) -> Self {
        value.code()
    }
}

impl FromStr for TableId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Self::try_from(code);
        }
        Self::ALL
            .into_iter()
            .find(|table| table.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown table '{s}'")))
    }
}

impl fmt::Display for TableId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(TableId::Product.code(), 1);
        assert_eq!(TableId::Category.code(), 6);
        assert_eq!(TableId::UserCategories.code(), 21);
        assert_eq!(TableId::Logout.code(), 22);
    }

    #[test]
    fn codes_round_trip_for_every_table() {
        for table in TableId::ALL {
            assert_eq!(TableId::try_from(table.code()).unwrap(), table);
        }
        assert!(TableId::try_from(0).is_err());
        assert!(TableId::try_from(23).is_err());
    }

    #[test]
    fn parses_names_and_numbers() {
        assert_eq!("product".parse::<TableId>().unwrap(), TableId::Product);
        assert_eq!("Out_Of_Stock".parse::<TableId>().unwrap(), TableId::OutOfStock);
        assert_eq!("9".parse::<TableId>().unwrap(), TableId::OrderSubs);
        assert!("warehouse".parse::<TableId>().is_err());
    }

    #[test]
    fn serde_uses_wire_codes() {
        let json = serde_json::to_string(&TableId::Orders).unwrap();
        assert_eq!(json, "8");
        let parsed: TableId = serde_json::from_str("14").unwrap();
        assert_eq!(parsed, TableId::Routes);
        assert!(serde_json::from_str::<TableId>("99").is_err());
    }

    #[test]
    fn only_logout_is_an_action() {
        assert!(TableId::Logout.is_action());
        assert!(!TableId::Product.is_action());
    }
}
