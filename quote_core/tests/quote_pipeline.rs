//! End-to-end pricing through the public API.

use chrono::NaiveDate;
use quote_core::calculations::delivery::DeliveryType;
use quote_core::calculations::item_cost::MarginMode;
use quote_core::calculations::price_rules::{find_best_rule, PriceRule, RuleContext};
use quote_core::calculations::print_quote::{calculate, PrintJobParameters};
use quote_core::calculations::quote::{calculate_quote, QuoteRequest};
use quote_core::file_io::{load_request, save_result};
use quote_core::money::round_money;

fn shop_request() -> QuoteRequest {
    QuoteRequest::from_json_str(
        r#"{
            "version": "0.1.0",
            "items": [
                { "naam": "Bracket", "aantal": 4, "uren": 1, "minuten": 30, "weight": "42,5",
                  "materiaal": { "id": 7, "naam": "PETG", "prijs_per_kg": 26 } },
                { "naam": "Figurine", "aantal": 1, "hours": 6, "weight": 180, "filamentType": "PLA Silk",
                  "modelleringNodig": "ja", "modellering_uur": 2, "gebruik_custom_uurtarief": true, "custom_uurtarief": 55 },
                { "naam": "Broken", "aantal": 1, "hours": 1, "weight": 0, "filamentType": "PLA Basic" }
            ],
            "form": { "korting": "5", "btw": 21, "deliveryType": "post", "vasteStartkost": 7.5 },
            "settings": { "postkost": 6.95, "winstmarge": 30, "stroomprijs": "0,25", "uurtarief": 45 },
            "price_rules": [
                { "id": 3, "material_id": 7, "price_per_unit": 22, "min_qty": 0.1 },
                { "id": 4, "material_id": 7, "client_id": 12, "price_per_unit": 19, "margin_override": 20 },
                { "id": 5, "material_id": 7, "client_id": 12, "min_qty": 5, "price_per_unit": 10 }
            ],
            "options": {
                "client_id": 12,
                "today": "2025-06-15",
                "custom_items": [
                    { "title": "Sanding", "quantity": 2, "price_amount": 100, "cost_amount": 60 }
                ]
            }
        }"#,
    )
    .unwrap()
}

#[test]
fn single_print_reference_example() {
    let params = PrintJobParameters::new(2.0, "PLA Basic", 100.0, 1)
        .with_profit_margin(0.25)
        .with_material_markup(0.2)
        .with_electricity_cost(0.12);

    let quote = calculate(&params).unwrap();
    assert!((quote.per_print_exact.material_raw - 2.338).abs() < 1e-12);
    assert_eq!(quote.per_print.material_raw, 2.34);
    assert_eq!(quote.per_print.material_with_markup, 2.81);
    assert_eq!(quote.per_print.electricity, 0.24);
    assert_eq!(quote.per_print.cost_before_margin, 3.05);
    assert_eq!(quote.per_print.cost_with_margin, 3.81);
    assert_eq!(quote.totals.prints_total, 3.81);
    assert_eq!(quote.input.delivery_type, DeliveryType::Pickup);
    assert_eq!(quote.totals.delivery_cost, 0.0);
    assert_eq!(quote.totals.subtotal, 3.81);
}

#[test]
fn rule_with_unmet_minimum_is_never_selected() {
    let rules = vec![
        PriceRule {
            id: 1,
            client_id: Some(3),
            material_id: Some(7),
            min_qty: Some(5.0.into()),
            ..Default::default()
        },
        PriceRule { id: 2, ..Default::default() },
    ];
    let context = RuleContext { client_id: Some(3), material_id: Some(7), weight_kg: 2.0 };
    let today = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    assert_eq!(find_best_rule(&rules, &context, today).map(|r| r.id), Some(2));
}

#[test]
fn full_quote_pipeline() {
    let result = calculate_quote(&shop_request()).unwrap();
    let totals = &result.totals;

    let lines: Vec<_> = result.print_lines().collect();
    assert_eq!(lines.len(), 3);

    // Batch of 4 × 42.5 g = 0.17 kg: rule 5 needs 5 kg, rule 4 is client-specific.
    assert_eq!(lines[0].price_rule_id, Some(4));
    let bracket = lines[0].cost.as_ref().unwrap();
    assert_eq!(bracket.quote.input.price_per_kg, 19.0);
    assert_eq!(bracket.margin_mode, MarginMode::RuleOverrideMargin(20.0));
    assert!(bracket.drying_applied);

    let figurine = lines[1].cost.as_ref().unwrap();
    assert_eq!(figurine.margin_mode, MarginMode::GlobalMargin(30.0));
    assert_eq!(figurine.quote.totals.design_total, 110.0);

    assert!(lines[2].error.is_some());
    assert_eq!(result.failed_items(), 1);

    let prints = bracket.quote.totals.prints_total + figurine.quote.totals.prints_total;
    assert_eq!(totals.prints_total, round_money(prints));
    assert_eq!(totals.design_total, 110.0);
    assert_eq!(totals.drying_total, bracket.quote.totals.drying.total);
    assert_eq!(totals.extra_allowances_total, 7.5);
    assert_eq!(totals.custom_items_total, 200.0);

    assert_eq!(totals.delivery_type, DeliveryType::Post);
    assert_eq!(totals.delivery_cost, 6.95);
    assert_eq!(totals.subtotal, round_money(totals.subtotal_before_delivery + 6.95));
    assert_eq!(totals.discount_percent, 5.0);
    assert_eq!(totals.total_final, round_money(totals.subtotal - totals.discount_value));
    assert_eq!(totals.total_incl_vat, round_money(totals.total_final + totals.vat_amount));

    let production = bracket.material_and_energy_cost() + figurine.material_and_energy_cost() + 120.0;
    assert_eq!(result.profit.production_cost, round_money(production));
    assert_eq!(
        result.profit.profit_amount,
        round_money(totals.total_final - result.profit.production_cost)
    );

    let custom = result.custom_lines().next().unwrap();
    assert_eq!(custom.line_total, 200.0);
    assert_eq!(custom.line_cost, 120.0);
    assert_eq!(custom.margin_amount, 80.0);
    assert!((custom.margin_percent - 66.7).abs() < 0.05);

    assert!(result
        .notes
        .contains("Price rule #4 applied to PETG for client #12: €19.00/kg, margin 20%"));
    assert!(result.notes.contains("Delivery: post (€6.95)"));
}

#[test]
fn quote_is_deterministic() {
    let request = shop_request();
    let first = calculate_quote(&request).unwrap();
    let second = calculate_quote(&request).unwrap();
    assert_eq!(first, second);
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[test]
fn saved_quote_keeps_its_price_after_settings_change() {
    let mut request = QuoteRequest::from_json_str(
        r#"{
            "items": [
                { "naam": "Hook", "aantal": 3, "hours": 1, "weight": 30, "filamentType": "PLA Basic", "subtotaal": "42,00" },
                { "naam": "Clip", "aantal": 1, "hours": 1, "weight": 10, "filamentType": "PLA Basic" }
            ],
            "options": { "use_stored_totals": true }
        }"#,
    )
    .unwrap();

    let before = calculate_quote(&request).unwrap();

    request.settings = serde_json::from_str(r#"{ "winstmarge": 90, "elektriciteitsprijs": 0.5 }"#).unwrap();
    let after = calculate_quote(&request).unwrap();

    let hook_before = before.print_lines().next().unwrap();
    let hook_after = after.print_lines().next().unwrap();
    assert_eq!(hook_before.subtotal, 42.0);
    assert_eq!(hook_after.subtotal, 42.0);

    // The unsaved line follows the new settings.
    let clip_before = before.print_lines().nth(1).unwrap();
    let clip_after = after.print_lines().nth(1).unwrap();
    assert!(clip_after.subtotal > clip_before.subtotal);
    assert_eq!(after.totals.prints_total, round_money(42.0 + clip_after.subtotal));
}

#[test]
fn request_file_round_trip_through_disk() {
    let dir = std::env::temp_dir();
    let request_path = dir.join(format!("quote_pipeline_request_{}.json", std::process::id()));
    let result_path = dir.join(format!("quote_pipeline_result_{}.json", std::process::id()));

    let request = shop_request();
    save_result(&request, &request_path).unwrap();

    let loaded = load_request(&request_path).unwrap();
    assert_eq!(loaded.items.len(), request.items.len());
    assert_eq!(loaded.settings, request.settings);

    let result = calculate_quote(&loaded).unwrap();
    assert_eq!(result, calculate_quote(&request).unwrap());

    save_result(&result, &result_path).unwrap();
    let saved: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&result_path).unwrap()).unwrap();
    assert_eq!(saved["totals"]["total_final"], result.totals.total_final);

    let _ = std::fs::remove_file(&request_path);
    let _ = std::fs::remove_file(&result_path);
}
