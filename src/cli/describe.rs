use super::ui;
use crate::core::Dataset;
use comfy_table::Cell;

/// Values a prediction request can be built from.
#[derive(Debug, Clone, PartialEq)]
pub struct InputRanges {
    pub min_area: f64,
    pub max_area: f64,
    pub rooms: Vec<i64>,
    pub addresses: Vec<String>,
}

impl InputRanges {
    pub fn from_dataset(dataset: &Dataset) -> Option<Self> {
        let (min_area, max_area) = dataset.area_range()?;
        Some(InputRanges {
            min_area,
            max_area,
            rooms: dataset.distinct_rooms(),
            addresses: dataset.distinct_addresses(),
        })
    }

    pub fn display_as_table(&self, rows: usize) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Input"), ui::header_cell("Allowed values")]);
        table.add_row(vec![
            Cell::new("Area (m²)"),
            Cell::new(format!("{} to {}", self.min_area, self.max_area)),
        ]);
        table.add_row(vec![
            Cell::new("Room"),
            Cell::new(
                self.rooms
                    .iter()
                    .map(|r| r.to_string())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
        ]);
        table.add_row(vec![
            Cell::new("Address"),
            Cell::new(format!("{} distinct", self.addresses.len())),
        ]);

        let mut output = format!(
            "{} ({} rows)\n\n",
            ui::style_text("Cleaned dataset", ui::StyleType::Title),
            rows
        );
        output.push_str(&table.to_string());
        output
    }
}

pub fn run(dataset: &Dataset) {
    let Some(ranges) = InputRanges::from_dataset(dataset) else {
        println!(
            "{}",
            ui::style_text("The cleaned dataset is empty.", ui::StyleType::Error)
        );
        return;
    };

    println!("{}", ranges.display_as_table(dataset.len()));
    ui::print_separator();
    println!(
        "{}\n{}",
        ui::style_text("Addresses", ui::StyleType::TotalLabel),
        ui::style_text(&ranges.addresses.join(", "), ui::StyleType::Subtle)
    );
}
