use super::ui;
use crate::SearchArgs;
use crate::core::fund::FundRecord;
use crate::core::{Criteria, Criterion, FundData, SearchOptions, SubstituteFinder, SubstituteSet};
use anyhow::{Context, Result};
use comfy_table::Cell;
use serde::Serialize;
use tracing::{debug, warn};

#[derive(Serialize)]
struct SubstituteReport<'a> {
    target: &'a FundRecord,
    cluster: i64,
    substitutes: Vec<ReportEntry<'a>>,
}

#[derive(Serialize)]
struct ReportEntry<'a> {
    rank: usize,
    distance: f64,
    raw: &'a FundRecord,
    normalized: &'a FundRecord,
}

pub fn run(data: &FundData, args: &SearchArgs, options: SearchOptions) -> Result<()> {
    let criteria = build_criteria(data, args)?;
    debug!("Searching substitutes for {} with {:?}", args.id, criteria);

    let result = SubstituteFinder::with_options(data, options).find(&args.id, &criteria)?;

    if args.json {
        println!("{}", render_json(data, &result)?);
    } else {
        println!(
            "\nSubstitutes for {} (cluster {})",
            ui::style_text(&args.id, ui::StyleType::Title),
            result.cluster
        );
        println!("{}", render_candidates(&result));
        if !criteria.is_empty() {
            println!("\n{}", ui::style_text("Criteria", ui::StyleType::Subtle));
            println!("{}", render_criteria(data, &criteria));
        }
        ui::print_separator();
        println!("\n{}", ui::style_text("Comparison", ui::StyleType::Title));
        println!("{}", render_comparison(data, &result));
    }
    Ok(())
}

/// Combines `--avoid` criteria, valued from the target's normalized record,
/// with the explicit `--exclude` pairs. Later entries replace earlier ones.
pub fn build_criteria(data: &FundData, args: &SearchArgs) -> Result<Criteria> {
    let mut criteria = Criteria::new();

    if let Some(target) = data.normalized().get(&args.id) {
        for name in &args.avoid {
            let criterion = name.parse::<Criterion>().with_context(|| {
                let known: Vec<&str> = Criterion::ALL.iter().map(|c| c.name()).collect();
                format!("Cannot avoid {name:?}, expected one of {}", known.join(", "))
            })?;
            criteria.insert(criterion.name(), criterion.value_of(target));
        }
    }

    for (name, value) in &args.exclude {
        if name.parse::<Criterion>().is_err() {
            warn!("Ignoring unknown criterion {}", name);
        }
        criteria.insert(name.as_str(), value.as_str());
    }
    Ok(criteria)
}

/// A threshold given in standardized units, mapped back to the raw scale.
///
/// `None` for categorical criteria, unparsable values, or when the
/// normalized table was loaded rather than fit here.
pub fn raw_threshold(data: &FundData, criterion: Criterion, value: &str) -> Option<f64> {
    let field = criterion.field()?;
    let z = value.trim().parse::<f64>().ok()?;
    data.scaler().map(|s| s.inverse_transform_value(field, z))
}

/// Criteria applied to the search, with numeric thresholds also shown in raw units.
pub fn render_criteria(data: &FundData, criteria: &Criteria) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Criterion"),
        ui::header_cell("Value"),
        ui::header_cell("Raw threshold"),
    ]);
    for (criterion, value) in criteria.recognized() {
        let raw = match criterion.field() {
            Some(_) => ui::number_cell(
                raw_threshold(data, criterion, value).unwrap_or(f64::NAN),
                |v| format!("{v:.4}"),
            ),
            None => Cell::new(value),
        };
        table.add_row(vec![Cell::new(criterion.name()), Cell::new(value), raw]);
    }
    table.to_string()
}

fn render_json(data: &FundData, result: &SubstituteSet) -> Result<String> {
    let target = data
        .raw()
        .get(&result.target_id)
        .context("Target fund missing from raw universe")?;

    let substitutes = result
        .candidates
        .iter()
        .enumerate()
        .filter_map(|(i, c)| {
            data.raw().get(&c.fund.id).map(|raw| ReportEntry {
                rank: i + 1,
                distance: c.distance,
                raw,
                normalized: &c.fund,
            })
        })
        .collect();

    let report = SubstituteReport {
        target,
        cluster: result.cluster,
        substitutes,
    };
    Ok(serde_json::to_string_pretty(&report)?)
}

/// Ranked candidates with their distance and categorical attributes.
pub fn render_candidates(result: &SubstituteSet) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Fund"),
        ui::header_cell("Distance"),
        ui::header_cell("Asset type"),
        ui::header_cell("Currency"),
        ui::header_cell("Geo zone"),
    ]);

    for (i, candidate) in result.candidates.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&candidate.fund.id),
            ui::number_cell(candidate.distance, |d| format!("{d:.4}")),
            Cell::new(&candidate.fund.asset_type),
            Cell::new(&candidate.fund.currency),
            Cell::new(&candidate.fund.geo_zone),
        ]);
    }
    table.to_string()
}

/// Raw attributes of the target fund followed by those of each candidate.
pub fn render_comparison(data: &FundData, result: &SubstituteSet) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Fund"),
        ui::header_cell("Cum. return"),
        ui::header_cell("Volatility"),
        ui::header_cell("Ongoing charges"),
        ui::header_cell("Mgmt fee"),
        ui::header_cell("Income"),
        ui::header_cell("Asset type"),
        ui::header_cell("Currency"),
        ui::header_cell("Geo zone"),
        ui::header_cell("Clean share"),
    ]);

    let rows = std::iter::once(result.target_id.as_str()).chain(result.ids());
    for (i, id) in rows.enumerate() {
        let Some(fund) = data.raw().get(id) else {
            continue;
        };
        let name = if i == 0 {
            ui::highlight_cell(&fund.id)
        } else {
            Cell::new(&fund.id)
        };
        table.add_row(vec![
            name,
            ui::number_cell(fund.cumulative_return, |v| format!("{v:.4}")),
            ui::number_cell(fund.volatility, |v| format!("{v:.4}")),
            ui::number_cell(fund.ongoing_charges, |v| format!("{v:.2}")),
            ui::number_cell(fund.management_fee, |v| format!("{v:.2}")),
            ui::number_cell(fund.income, |v| format!("{v:.2}")),
            Cell::new(&fund.asset_type),
            Cell::new(&fund.currency),
            Cell::new(&fund.geo_zone),
            ui::flag_cell(fund.clean_share),
        ]);
    }
    table.to_string()
}
