use cash_flow_waterfall::*;

fn print_waterfall(title: &str, steps: &[CalculatedStep]) {
    println!("\n{}", title);
    for step in steps {
        let indent = "  ".repeat(step.level as usize + 1);
        match step.kind {
            StepKind::Deduction => println!(
                "{}- {:<20} {:>10}   -> {:>10}",
                indent,
                step.name,
                format_currency(step.value),
                format_currency(step.remaining)
            ),
            _ => println!(
                "{}{:<22} {:>10}",
                indent,
                step.name,
                format_currency(step.remaining)
            ),
        }
    }
}

fn main() -> Result<()> {
    let state = FinancialState::new(FinancialData::sample())?;
    print_waterfall("Starting budget", state.calculated_steps());
    println!("Illegal: {}", state.is_illegal());

    let state = state.dispatch(Command::UpdateBreakdownItem {
        step_name: FIXED_SPEND.to_string(),
        item_name: "Rent".to_string(),
        amount: dollars_to_cents(1_500.0)?,
    });
    print_waterfall("After moving to a cheaper apartment", state.calculated_steps());
    println!("Illegal: {}", state.is_illegal());

    let state = state.preview_scenario(vec![
        ScenarioChange::income(dollars_to_cents(6_000.0)?, Recurrence::OneTime, "Bonus"),
        ScenarioChange::item(
            VARIABLE_SPEND,
            "Restaurants",
            dollars_to_cents(-50.0)?,
            Recurrence::Recurring,
            "Cook at home more",
        ),
    ]);
    print_waterfall("Previewing bonus + dining cut", state.displayed_steps());
    if let Some(impact) = state.scenario_impact() {
        println!(
            "Surplus {} -> {} ({})",
            format_currency(impact.surplus_before),
            format_currency(impact.surplus_after),
            format_currency(impact.surplus_delta)
        );
    }

    let state = state.apply_scenario();
    let summary = WaterfallSummary::from_steps(state.calculated_steps());
    println!(
        "\nApplied. Savings rate {:.1}%, undo depth {}",
        summary.savings_rate * 100.0,
        state.undo_history().len()
    );

    let state = state.undo();
    println!(
        "Undone. Income back to {}",
        format_currency(state.data().monthly_income)
    );

    println!(
        "\nSchema for change proposers:\n{}",
        serde_json::to_string_pretty(&ScenarioProposal::response_schema()?)?
    );

    Ok(())
}
