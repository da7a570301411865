//! Static catalog of synchronized tables
//!
//! Every entity kind mirrored locally has exactly one [`TableDescriptor`]. The
//! order of [`CATALOG`] is the order a full sync walks the tables in, and each
//! descriptor's role set is the role-filter matrix.

use crate::models::{RoleSet, TableId, UserType};

/// Rows requested per page during a full sync.
pub const DEFAULT_PAGE_SIZE: u32 = 500;

/// Immutable description of one synchronized entity kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDescriptor {
    pub table_id: TableId,
    /// Path segment of the download endpoint (`/{endpoint}`)
    pub endpoint: &'static str,
    /// Local mirror table the rows are upserted into
    pub mirror_table: &'static str,
    /// Record field copied into the mirror's `label` column
    pub label_field: &'static str,
    pub page_size: u32,
    /// User types that synchronize this table
    pub roles: RoleSet,
}

impl TableDescriptor {
    const fn new(
        table_id: TableId,
        endpoint: &'static str,
        mirror_table: &'static str,
        label_field: &'static str,
        roles: RoleSet,
    ) -> Self {
        Self {
            table_id,
            endpoint,
            mirror_table,
            label_field,
            page_size: DEFAULT_PAGE_SIZE,
            roles,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.table_id.as_str()
    }

    /// Whether `user_type` synchronizes this table.
    pub const fn includes(&self, user_type: UserType) -> bool {
        self.roles.contains(user_type)
    }
}

const EVERYONE: RoleSet = RoleSet::ALL;
const NOT_SUPPLIER: RoleSet = RoleSet::ALL.without(UserType::Supplier);
const STOCK_KEEPERS: RoleSet =
    RoleSet::of(&[UserType::Admin, UserType::Storekeeper, UserType::Supplier]);
const RACK_STAFF: RoleSet =
    RoleSet::of(&[UserType::Admin, UserType::Storekeeper, UserType::Checker]);
const FLEET: RoleSet = RoleSet::of(&[UserType::Admin, UserType::Storekeeper, UserType::Driver]);
const DELIVERY_STAFF: RoleSet = RoleSet::of(&[
    UserType::Admin,
    UserType::Storekeeper,
    UserType::Biller,
    UserType::Checker,
    UserType::Driver,
]);

/// Master sync order.
pub static CATALOG: [TableDescriptor; 21] = [
    TableDescriptor::new(TableId::Product, "product_downloads", "products", "name", EVERYONE),
    TableDescriptor::new(TableId::CarBrand, "car_brand_downloads", "car_brands", "name", EVERYONE),
    TableDescriptor::new(TableId::CarName, "car_name_downloads", "car_names", "name", EVERYONE),
    TableDescriptor::new(TableId::CarModel, "car_model_downloads", "car_models", "name", EVERYONE),
    TableDescriptor::new(
        TableId::CarVersion,
        "car_version_downloads",
        "car_versions",
        "name",
        EVERYONE,
    ),
    TableDescriptor::new(TableId::Category, "category_downloads", "categories", "name", EVERYONE),
    TableDescriptor::new(
        TableId::SubCategory,
        "sub_category_downloads",
        "sub_categories",
        "name",
        EVERYONE,
    ),
    TableDescriptor::new(TableId::Orders, "orders_downloads", "orders", "order_no", NOT_SUPPLIER),
    TableDescriptor::new(
        TableId::OrderSubs,
        "order_subs_downloads",
        "order_subs",
        "product_name",
        NOT_SUPPLIER,
    ),
    TableDescriptor::new(
        TableId::Customers,
        "customers_downloads",
        "customers",
        "name",
        NOT_SUPPLIER,
    ),
    TableDescriptor::new(TableId::Users, "users_downloads", "users", "name", NOT_SUPPLIER),
    TableDescriptor::new(TableId::Salesmen, "salesmen_downloads", "salesmen", "name", NOT_SUPPLIER),
    TableDescriptor::new(TableId::Units, "units_downloads", "units", "name", EVERYONE),
    TableDescriptor::new(TableId::Routes, "routes_downloads", "routes", "name", EVERYONE),
    TableDescriptor::new(
        TableId::Suppliers,
        "suppliers_downloads",
        "suppliers",
        "name",
        STOCK_KEEPERS,
    ),
    TableDescriptor::new(
        TableId::OutOfStock,
        "out_of_stock_downloads",
        "out_of_stock",
        "product_name",
        STOCK_KEEPERS,
    ),
    TableDescriptor::new(
        TableId::OutOfStockSubs,
        "out_of_stock_subs_downloads",
        "out_of_stock_subs",
        "product_name",
        STOCK_KEEPERS,
    ),
    TableDescriptor::new(TableId::Racks, "racks_downloads", "racks", "code", RACK_STAFF),
    TableDescriptor::new(TableId::Vehicles, "vehicles_downloads", "vehicles", "number", FLEET),
    TableDescriptor::new(
        TableId::Deliveries,
        "deliveries_downloads",
        "deliveries",
        "order_no",
        DELIVERY_STAFF,
    ),
    TableDescriptor::new(
        TableId::UserCategories,
        "user_categories_downloads",
        "user_categories",
        "name",
        EVERYONE,
    ),
];

/// All synchronized tables in master order.
pub fn catalog() -> &'static [TableDescriptor] {
    &CATALOG
}

/// Descriptor of a synchronized table; `None` for action ids such as logout.
pub fn descriptor(table_id: TableId) -> Option<&'static TableDescriptor> {
    CATALOG
        .iter()
        .find(|descriptor| descriptor.table_id == table_id)
}
