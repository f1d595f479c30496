//! # Offr3d CLI Application
//!
//! Terminal interface to the quote engine.
//!
//! ## Usage
//!
//! ```text
//! quote_cli quote <request.json> [--output <result.json>]
//! quote_cli single <job.json>
//! quote_cli                      # interactive single-print demo
//! ```
//!
//! Log output goes to stderr; set `RUST_LOG=quote_core=debug` for detail.

mod logging;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;

use quote_core::calculations::delivery::DeliveryType;
use quote_core::calculations::print_quote::{self, PrintJobParameters, PrintQuote};
use quote_core::calculations::quote::{calculate_quote, QuoteLine, QuoteResult};
use quote_core::errors::{PricingError, PricingResult};
use quote_core::file_io::{load_job, load_request, save_result};
use quote_core::filament::default_prices;
use quote_core::money::{format_eur, format_percent};
use quote_core::numeric::parse_decimal;

enum Command {
    Quote { request: PathBuf, output: Option<PathBuf> },
    Single { job: PathBuf },
    Demo,
}

const USAGE: &str = "Usage:
  quote_cli quote <request.json> [--output <result.json>]
  quote_cli single <job.json>
  quote_cli                      (interactive demo)";

fn parse_args(args: &[String]) -> Result<Command, String> {
    match args.first().map(String::as_str) {
        None => Ok(Command::Demo),
        Some("quote") => {
            let mut request = None;
            let mut output = None;
            let mut i = 1;
            while i < args.len() {
                match args[i].as_str() {
                    "--output" | "-o" => {
                        i += 1;
                        let path = args.get(i).ok_or("--output needs a file path")?;
                        output = Some(PathBuf::from(path));
                    }
                    path if request.is_none() => request = Some(PathBuf::from(path)),
                    other => return Err(format!("Unexpected argument '{}'", other)),
                }
                i += 1;
            }
            let request = request.ok_or("quote needs a request file")?;
            Ok(Command::Quote { request, output })
        }
        Some("single") => match args.get(1) {
            Some(path) if args.len() == 2 => Ok(Command::Single { job: PathBuf::from(path) }),
            _ => Err("single needs exactly one job file".to_string()),
        },
        Some(other) => Err(format!("Unknown command '{}'", other)),
    }
}

fn prompt_f64(prompt: &str, default: f64) -> f64 {
    prompt_line(prompt)
        .and_then(|input| parse_decimal(&input))
        .unwrap_or(default)
}

fn prompt_string(prompt: &str, default: &str) -> String {
    prompt_line(prompt)
        .filter(|input| !input.is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn prompt_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    io::stdout().flush().ok()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input).ok()?;
    Some(input.trim().to_string())
}

fn print_json<T: serde::Serialize>(value: &T) {
    println!();
    println!("JSON Output:");
    if let Ok(json) = serde_json::to_string_pretty(value) {
        println!("{}", json);
    }
}

fn print_single(quote: &PrintQuote) {
    let input = &quote.input;
    let per_print = &quote.per_print;
    let totals = &quote.totals;

    println!("═══════════════════════════════════════");
    println!("  PRINT QUOTE");
    println!("═══════════════════════════════════════");
    println!();
    println!("Input:");
    println!("  Filament:  {} ({}/kg)", input.filament_type, format_eur(input.price_per_kg));
    println!("  Weight:    {:.1} g x {}", input.filament_weight_grams, input.number_of_prints);
    println!("  Time:      {:.2} h per print", input.printing_time_hours);
    println!("  Delivery:  {}", input.delivery_type.display_name());
    println!();
    println!("Per print:");
    println!("  Material:      {} ({} with markup)", format_eur(per_print.material_raw), format_eur(per_print.material_with_markup));
    println!("  Electricity:   {}", format_eur(per_print.electricity));
    println!("  Cost:          {}", format_eur(per_print.cost_before_margin));
    println!("  Price:         {}", format_eur(per_print.cost_with_margin));
    println!();
    println!("Totals:");
    println!("  Prints:        {}", format_eur(totals.prints_total));
    println!("  Design:        {}", format_eur(totals.design_total));
    println!("  Drying:        {}", format_eur(totals.drying_total()));
    println!("  Extras:        {}", format_eur(totals.extra_allowances));
    println!("  Delivery:      {}", format_eur(totals.delivery_cost));
    println!("  Subtotal:      {}", format_eur(totals.subtotal));
    println!("  Discount:      -{} ({})", format_eur(totals.discount_value), format_percent(totals.discount_percent));
    println!();
    println!("═══════════════════════════════════════");
    println!("  TOTAL: {}", format_eur(totals.total_final));
    println!("═══════════════════════════════════════");
    println!();
    for note in &quote.notes {
        println!("  * {}", note);
    }
}

fn print_quote_summary(result: &QuoteResult) {
    let totals = &result.totals;

    println!("═══════════════════════════════════════");
    println!("  QUOTE");
    println!("═══════════════════════════════════════");
    println!();
    for line in &result.lines {
        match line {
            QuoteLine::Print(print) => {
                let label = print.label.as_deref().unwrap_or("print item");
                match &print.error {
                    Some(error) => println!("  [{}] {}: {}", print.index + 1, label, error),
                    None => println!("  [{}] {} x{}: {}", print.index + 1, label, print.quantity, format_eur(print.subtotal)),
                }
            }
            QuoteLine::Custom(custom) => {
                let marker = if custom.selected { "" } else { " (not selected)" };
                println!("  [+] {} x{}: {}{}", custom.title, custom.quantity, format_eur(custom.line_total), marker);
            }
        }
    }
    println!();
    println!("  Subtotal:      {}", format_eur(totals.subtotal_before_delivery));
    println!("  Delivery:      {} ({})", format_eur(totals.delivery_cost), totals.delivery_type.display_name());
    println!("  Discount:      -{} ({})", format_eur(totals.discount_value), format_percent(totals.discount_percent));
    println!("  Total excl.:   {}", format_eur(totals.total_final));
    println!("  VAT:           {} ({})", format_eur(totals.vat_amount), format_percent(totals.vat_percent));
    println!();
    println!("═══════════════════════════════════════");
    println!("  TOTAL: {}", format_eur(totals.total_incl_vat));
    println!("  Profit: {} ({})", format_eur(result.profit.profit_amount), format_percent(result.profit.profit_percent));
    println!("═══════════════════════════════════════");
    println!();
    for note in result.notes.iter() {
        println!("  * {}", note);
    }
}

fn run_quote(request: PathBuf, output: Option<PathBuf>) -> PricingResult<()> {
    let request = load_request(&request)?;
    let result = calculate_quote(&request)?;

    print_quote_summary(&result);
    print_json(&result);

    if let Some(path) = output {
        save_result(&result, &path)?;
        println!();
        println!("Saved to {}", path.display());
    }
    Ok(())
}

fn run_single(job: PathBuf) -> PricingResult<()> {
    let params = load_job(&job)?;
    let quote = print_quote::calculate(&params)?;
    print_single(&quote);
    print_json(&quote);
    Ok(())
}

fn run_demo() -> PricingResult<()> {
    println!("Offr3d CLI - 3D Print Quote Calculator");
    println!("======================================");
    println!();
    println!("Filament types: {}", default_prices().types().join(", "));
    println!();

    let weight = prompt_f64("Filament weight per print (g) [100]: ", 100.0);
    let hours = prompt_f64("Print time per print (h) [2]: ", 2.0);
    let filament = prompt_string("Filament type [PLA Basic]: ", "PLA Basic");
    let count = prompt_f64("Number of prints [1]: ", 1.0);
    let delivery = prompt_string("Delivery (afhaling/post/24h/48h) [afhaling]: ", "afhaling");

    println!();

    let delivery: DeliveryType = delivery.parse()?;
    let params = PrintJobParameters::new(hours, filament, weight, count.max(0.0) as u32).with_delivery(delivery);
    let quote = print_quote::calculate(&params)?;
    print_single(&quote);
    print_json(&quote);
    Ok(())
}

fn report_error(e: &PricingError) {
    eprintln!("Error: {}", e);
    if let Ok(json) = serde_json::to_string_pretty(e) {
        eprintln!();
        eprintln!("Error JSON:");
        eprintln!("{}", json);
    }
}

fn main() {
    logging::init();

    let args: Vec<String> = env::args().skip(1).collect();
    let command = match parse_args(&args) {
        Ok(command) => command,
        Err(message) => {
            eprintln!("{}", message);
            eprintln!();
            eprintln!("{}", USAGE);
            process::exit(1);
        }
    };

    let outcome = match command {
        Command::Quote { request, output } => run_quote(request, output),
        Command::Single { job } => run_single(job),
        Command::Demo => run_demo(),
    };

    if let Err(e) = outcome {
        report_error(&e);
        process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_parse_quote_with_output() {
        match parse_args(&args(&["quote", "in.json", "--output", "out.json"])).unwrap() {
            Command::Quote { request, output } => {
                assert_eq!(request, PathBuf::from("in.json"));
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("expected quote command"),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_args(&args(&["quote"])).is_err());
        assert!(parse_args(&args(&["quote", "a.json", "--output"])).is_err());
        assert!(parse_args(&args(&["single"])).is_err());
        assert!(parse_args(&args(&["bake"])).is_err());
        assert!(matches!(parse_args(&[]), Ok(Command::Demo)));
    }
}
