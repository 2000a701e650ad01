use super::ui;
use crate::core::CleanOutcome;
use comfy_table::Cell;

impl CleanOutcome {
    pub fn display_as_table(&self) -> String {
        let mut output = format!(
            "{}\n\n",
            ui::style_text("Dataset cleaning", ui::StyleType::Title)
        );

        if self.from_cache {
            output.push_str(&format!(
                "Loaded {} rows from cache {}\n",
                ui::style_text(&self.dataset.len().to_string(), ui::StyleType::TotalValue),
                self.cache.read.display()
            ));
            return output;
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Step"), ui::header_cell("Rows")]);
        let report = self.report.as_ref();
        let steps = [
            ("Raw rows", report.map(|r| r.raw_rows)),
            ("Without missing values", report.map(|r| r.after_missing)),
            ("Without duplicates", report.map(|r| r.after_duplicates)),
            ("Without Price outliers", report.map(|r| r.after_price_outliers)),
            ("Without Area outliers", report.map(|r| r.after_area_outliers)),
        ];
        for (label, rows) in steps {
            table.add_row(vec![
                Cell::new(label),
                ui::format_optional_cell(rows, |n| n.to_string()),
            ]);
        }
        output.push_str(&table.to_string());

        if let Some(quote) = &self.rate {
            let rate = format!(
                "{} IRR/USD ({})",
                ui::format_amount(quote.rate),
                quote.source
            );
            let style_type = if quote.is_fallback() {
                ui::StyleType::Warning
            } else {
                ui::StyleType::TotalValue
            };
            output.push_str(&format!(
                "\n\n{}: {}",
                ui::style_text("Exchange rate", ui::StyleType::TotalLabel),
                ui::style_text(&rate, style_type)
            ));
        }

        output.push_str(&format!(
            "\n{}: {}",
            ui::style_text("Written to", ui::StyleType::TotalLabel),
            self.cache.write.display()
        ));
        if !self.cache.is_consistent() {
            output.push_str(&format!(
                "\n{}",
                ui::style_text(
                    &format!(
                        "Note: the next run looks for {} and will clean again.",
                        self.cache.read.display()
                    ),
                    ui::StyleType::Subtle
                )
            ));
        }
        output
    }
}

pub fn run(outcome: &CleanOutcome) {
    println!("{}", outcome.display_as_table());
}
