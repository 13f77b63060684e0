use super::ui;
use crate::core::ForecastEntry;
use crate::core::price::format_period;
use crate::sensor::{AmberSensor, SensorState};
use comfy_table::Cell;

fn periods_table(title: &str, entries: &[ForecastEntry]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Period (UTC)"),
        ui::header_cell("Price (c/kWh)"),
        ui::header_cell("Renewables (%)"),
        ui::header_cell("Band"),
    ]);

    for entry in entries {
        table.add_row(vec![
            Cell::new(format_period(&entry.period_start)),
            ui::number_cell(entry.price_per_kwh, |p| format!("{p:.2}")),
            ui::number_cell(entry.renewable_fraction, |r| format!("{:.1}", r * 100.0)),
            ui::band_cell(entry.band),
        ]);
    }

    format!("{}\n{}", ui::style_text(title, ui::StyleType::Label), table)
}

/// Renders the sensor state, its last update and the surrounding periods.
pub fn display_sensor(sensor: &AmberSensor) -> String {
    let mut output = format!(
        "Sensor: {}\n\n",
        ui::style_text(sensor.name(), ui::StyleType::Title)
    );

    let state = sensor.state();
    let state_style = match state {
        SensorState::Price(_) => ui::StyleType::Value,
        SensorState::Unknown => ui::StyleType::Error,
    };
    output.push_str(&format!(
        "{}: {}\n",
        ui::style_text("Current price (c/kWh)", ui::StyleType::Label),
        ui::style_text(&state.to_string(), state_style)
    ));

    let Some(reading) = sensor.reading() else {
        output.push_str(&ui::style_text(sensor.attribution(), ui::StyleType::Subtle));
        return output;
    };

    output.push_str(&format!(
        "{}: {}\n{}: {:.1}%\n{}: {}\n\n",
        ui::style_text("Period (UTC)", ui::StyleType::Label),
        format_period(&reading.current_period_start),
        ui::style_text("Renewables in grid", ui::StyleType::Label),
        reading.current_renewable_fraction * 100.0,
        ui::style_text("Band", ui::StyleType::Label),
        reading.current_price_band,
    ));

    output.push_str(&periods_table("Forecast", &reading.forecast_entries));
    output.push_str("\n\n");
    output.push_str(&periods_table("Previous", &reading.previous_entries));
    output.push_str("\n\n");
    output.push_str(&ui::style_text(sensor.attribution(), ui::StyleType::Subtle));
    output
}
