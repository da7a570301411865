use depot_core::UserType;
use depot_core::sync::sync_plan;

use crate::commands::common::{PlannedTableItem, format_plan_lines, planned_table_to_item};
use crate::error::CliError;

pub fn run_tables(user_type: UserType, as_json: bool) -> Result<(), CliError> {
    let plan = sync_plan(user_type);

    if as_json {
        let json_items = plan
            .iter()
            .map(planned_table_to_item)
            .collect::<Vec<PlannedTableItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    println!("Tables for {user_type}:");
    for line in format_plan_lines(&plan) {
        println!("{line}");
    }
    Ok(())
}
