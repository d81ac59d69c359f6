use super::ui;
use crate::core::fund::NumericField;
use crate::core::{Criterion, FundData, SubstituteError};
use anyhow::Result;
use comfy_table::Cell;

pub fn run(data: &FundData, id: &str) -> Result<()> {
    let output = render(data, id)?;
    println!("{output}");
    Ok(())
}

/// Renders a fund's raw and normalized attributes, cluster membership and
/// the criterion values it would pass to `search --avoid`.
pub fn render(data: &FundData, id: &str) -> Result<String> {
    let (Some(raw), Some(normalized)) = (data.raw().get(id), data.normalized().get(id)) else {
        return Err(SubstituteError::FundNotFound { id: id.to_string() }.into());
    };
    let cluster_size = data
        .raw()
        .cluster_sizes()
        .get(&raw.cluster)
        .copied()
        .unwrap_or_default();

    let mut out = format!(
        "\nFund: {}\nCluster: {} ({} funds)\n",
        ui::style_text(&raw.id, ui::StyleType::Title),
        raw.cluster,
        cluster_size
    );

    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Attribute"),
        ui::header_cell("Raw"),
        ui::header_cell("Normalized"),
    ]);
    for field in NumericField::ALL {
        table.add_row(vec![
            Cell::new(field.column()),
            ui::number_cell(raw.numeric(field), |v| format!("{v:.4}")),
            ui::number_cell(normalized.numeric(field), |v| format!("{v:.4}")),
        ]);
    }
    table.add_row(vec![Cell::new("asset_type"), Cell::new(&raw.asset_type), Cell::new("")]);
    table.add_row(vec![Cell::new("currency"), Cell::new(&raw.currency), Cell::new("")]);
    table.add_row(vec![Cell::new("geo_zone"), Cell::new(&raw.geo_zone), Cell::new("")]);
    table.add_row(vec![
        Cell::new("clean_share"),
        ui::flag_cell(raw.clean_share),
        Cell::new(""),
    ]);
    out.push_str(&table.to_string());

    let mut criteria = ui::new_styled_table();
    criteria.set_header(vec![ui::header_cell("Criterion"), ui::header_cell("Value")]);
    for criterion in Criterion::ALL {
        criteria.add_row(vec![
            Cell::new(criterion.name()),
            Cell::new(criterion.value_of(normalized)),
        ]);
    }
    out.push_str(&format!(
        "\n\n{}\n{}",
        ui::style_text("Criterion values", ui::StyleType::Subtle),
        criteria
    ));
    Ok(out)
}
