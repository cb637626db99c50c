//! Tabular comparison of historical, template, and simulated blocks.

use prettytable::{format, Cell, Row, Table};

use tidepool_core::block::Block;

/// Group digits with thousands separators, e.g. `1234567` → `1,234,567`.
fn commas(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Percentage with three decimals, `0.000` when the denominator is zero.
fn percent(numerator: u64, denominator: u64) -> String {
    if denominator == 0 {
        return "0.000".into();
    }
    format!("{:.3}", 100.0 * numerator as f64 / denominator as f64)
}

/// Build the block comparison table: one column per block, ordered by
/// height, with the chain tip first.
///
/// Sigops are unknown for blocks the node reported without them (the tip
/// record) and shown as N/A.
pub fn blocks_table(blocks: &[Block]) -> Table {
    let mut blocks: Vec<&Block> = blocks.iter().collect();
    blocks.sort_by_key(|b| b.height);
    let tip_height = blocks.first().map(|b| b.height).unwrap_or(0);

    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_NO_LINESEP_WITH_TITLE);

    let mut header = vec![Cell::new("block:")];
    header.extend(blocks.iter().map(|b| Cell::new(&b.height.to_string())));
    table.set_titles(Row::new(header));

    let rows: Vec<(&str, Vec<String>)> = vec![
        (
            "tip offset",
            blocks.iter().map(|b| (b.height - tip_height).to_string()).collect(),
        ),
        ("reward", blocks.iter().map(|b| commas(b.reward())).collect()),
        ("subsidy", blocks.iter().map(|b| commas(b.subsidy())).collect()),
        ("fee", blocks.iter().map(|b| commas(b.fee)).collect()),
        (
            "fee / block reward",
            blocks.iter().map(|b| percent(b.fee, b.reward())).collect(),
        ),
        (
            "reward / prev block",
            blocks
                .iter()
                .enumerate()
                .map(|(i, b)| {
                    if i == 0 {
                        "0.000".into()
                    } else {
                        percent(b.reward(), blocks[i - 1].reward())
                    }
                })
                .collect(),
        ),
        ("weight", blocks.iter().map(|b| commas(b.weight)).collect()),
        (
            "sigops",
            blocks
                .iter()
                .map(|b| {
                    if b.sigops_cost == 0 {
                        "N/A".into()
                    } else {
                        commas(b.sigops_cost)
                    }
                })
                .collect(),
        ),
    ];

    for (label, cells) in rows {
        let mut row = vec![Cell::new(label)];
        row.extend(cells.iter().map(|c| Cell::new(c)));
        table.add_row(Row::new(row));
    }

    table
}
