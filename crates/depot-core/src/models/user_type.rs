//! Workforce roles and role sets

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Role of the signed-in user, as numbered by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub enum UserType {
    Admin = 1,
    Storekeeper = 2,
    Salesman = 3,
    Supplier = 4,
    Biller = 5,
    Checker = 6,
    Driver = 7,
}

impl UserType {
    pub const ALL: [Self; 7] = [
        Self::Admin,
        Self::Storekeeper,
        Self::Salesman,
        Self::Supplier,
        Self::Biller,
        Self::Checker,
        Self::Driver,
    ];

    pub const fn code(self) -> i64 {
        self as i64
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Storekeeper => "storekeeper",
            Self::Salesman => "salesman",
            Self::Supplier => "supplier",
            Self::Biller => "biller",
            Self::Checker => "checker",
            Self::Driver => "driver",
        }
    }

    const fn bit(self) -> u8 {
        1 << (self as u8 - 1)
    }
}

impl TryFrom<i64> for UserType {
    type Error = Error;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|user_type| user_type.code() == value)
            .ok_or_else(|| Error::InvalidInput(format!("unknown user type {value}")))
    }
}

impl From<UserType> for i64 {
    fn from(value: UserType) -> Self {
        value.code()
    }
}

impl FromStr for UserType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if let Ok(code) = s.parse::<i64>() {
            return Self::try_from(code);
        }
        Self::ALL
            .into_iter()
            .find(|user_type| user_type.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::InvalidInput(format!("unknown user type '{s}'")))
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compact set of user types, usable in `const` table definitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RoleSet(u8);

impl RoleSet {
    pub const EMPTY: Self = Self(0);
    pub const ALL: Self = Self::of(&UserType::ALL);

    /// Build a set from a list of user types.
    pub const fn of(types: &[UserType]) -> Self {
        let mut bits = 0u8;
        let mut index = 0;
        while index < types.len() {
            bits |= types[index].bit();
            index += 1;
        }
        Self(bits)
    }

    /// Every role except `user_type`.
    #[must_use]
    pub const fn without(self, user_type: UserType) -> Self {
        Self(self.0 & !user_type.bit())
    }

    pub const fn contains(self, user_type: UserType) -> bool {
        self.0 & user_type.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Members in server numbering order.
    pub fn iter(self) -> impl Iterator<Item = UserType> {
        UserType::ALL
            .into_iter()
            .filter(move |user_type| self.contains(*user_type))
    }
}
