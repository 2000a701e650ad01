use super::ui;
use crate::core::numerals::to_persian_digits;
use crate::core::{ExchangeRateProvider, RateQuote, rate::REFERENCE_RATE};
use anyhow::Result;
use comfy_table::Cell;

fn display_quote(quote: &RateQuote) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Field"), ui::header_cell("Value")]);
    table.add_row(vec![
        Cell::new("USD (IRR)"),
        ui::number_cell(ui::format_amount(quote.rate)),
    ]);
    table.add_row(vec![
        Cell::new("USD (ریال)"),
        ui::number_cell(to_persian_digits(&ui::format_amount(quote.rate))),
    ]);
    table.add_row(vec![
        Cell::new("Reference rate (IRR)"),
        ui::number_cell(ui::format_amount(REFERENCE_RATE)),
    ]);
    table.add_row(vec![
        Cell::new("Price coefficient"),
        ui::number_cell(format!("{:.4}", quote.coefficient())),
    ]);
    table.add_row(vec![Cell::new("Source"), Cell::new(quote.source.to_string())]);
    table.add_row(vec![
        Cell::new("Fetched at"),
        Cell::new(quote.fetched_at.format("%Y-%m-%d %H:%M:%S UTC").to_string()),
    ]);

    let mut output = format!(
        "{}\n\n",
        ui::style_text("USD exchange rate", ui::StyleType::Title)
    );
    output.push_str(&table.to_string());
    if quote.is_fallback() {
        output.push_str(&format!(
            "\n\n{}",
            ui::style_text(
                "Live rate unavailable, using the fallback rate.",
                ui::StyleType::Warning
            )
        ));
    }
    output
}

pub async fn run(provider: &(dyn ExchangeRateProvider + Send + Sync)) -> Result<()> {
    let quote = provider.fetch_rate().await?;
    println!("{}", display_quote(&quote));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_live_quote() {
        let output = display_quote(&RateQuote::live(612_350.0));
        assert!(output.contains("612,350"));
        assert!(output.contains("۶۱۲,۳۵۰"));
        assert!(output.contains("2.0412"));
        assert!(output.contains("live"));
        assert!(!output.contains("fallback rate"));
    }

    #[test]
    fn test_display_fallback_quote() {
        let output = display_quote(&RateQuote::fallback(REFERENCE_RATE));
        assert!(output.contains("1.0000"));
        assert!(output.contains("using the fallback rate"));
    }
}
