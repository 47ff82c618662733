//! Basic ledger usage example: one quarter of trading, closing, and statements

use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use ledger_core::{
    patterns, Actor, Ledger, LedgerConfig, MemoryStorage, ReportGenerator, VoucherBuilder,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let ledger = Ledger::with_config(MemoryStorage::new(), LedgerConfig::load()?);
    let clerk = Actor::new("clerk");
    let manager = Actor::new("manager");
    let date = |m, d| NaiveDate::from_ymd_opt(2024, m, d).ok_or("invalid date");

    println!("Setting up chart of accounts...");
    let chart = ledger.setup_standard_chart().await?;
    println!("  {} accounts created\n", chart.len());

    let inputs = vec![
        patterns::owner_investment(date(1, 2)?, "Initial investment", "1002", "4001", BigDecimal::from(50_000))?,
        patterns::asset_purchase(date(1, 5)?, "Office equipment", "1601", "1002", BigDecimal::from(8_000))?,
        patterns::sale(date(1, 15)?, "Product sales", "1002", "6001", BigDecimal::from(12_000))?,
        patterns::expense_payment(date(2, 1)?, "Advertising", "6601", "1002", BigDecimal::from(1_500))?,
        VoucherBuilder::new(date(2, 20)?, "Materials used in production")
            .debit("6401", BigDecimal::from(4_000), Some("Cost of goods sold".to_string()))
            .credit("2202", BigDecimal::from(4_000), Some("Supplier invoice".to_string()))
            .build()?,
        patterns::loan_received(date(3, 1)?, "Customer prepayment", "1001", "2203", BigDecimal::from(2_000))?,
    ];

    println!("Recording vouchers...");
    for input in inputs {
        let voucher = ledger.create_voucher(input, &clerk).await?;
        ledger.approve_voucher(voucher.id, &manager).await?;
        ledger.post_voucher(voucher.id, &manager).await?;
        println!(
            "  {} {} {}",
            voucher.voucher_number, voucher.transaction_date, voucher.summary
        );
    }
    println!();

    let quarter_start = date(1, 1)?;
    let quarter_end = date(3, 31)?;

    let income = ledger.income_statement(quarter_start, quarter_end).await?;
    println!("Income statement {} to {}", quarter_start, quarter_end);
    println!("  Income:       {}", income.total_income);
    println!("  Cost:         {}", income.total_cost);
    println!("  Gross profit: {}", income.gross_profit);
    println!("  Expenses:     {}", income.total_expense);
    println!("  Net profit:   {}\n", income.net_profit);

    let flow = ledger.cash_flow(quarter_start, quarter_end).await?;
    println!("Cash flow");
    println!("  Operating: {}", flow.operating.net);
    println!("  Investing: {}", flow.investing.net);
    println!("  Financing: {}", flow.financing.net);
    println!("  Cash {} -> {}\n", flow.beginning_cash, flow.ending_cash);

    let closing = ledger.close_period(quarter_end, &manager).await?;
    ledger.approve_voucher(closing.id, &manager).await?;
    ledger.post_voucher(closing.id, &manager).await?;
    println!("Closed the quarter with {}", closing.voucher_number);

    let sheet = ledger.balance_sheet(quarter_end).await?;
    println!("Balance sheet as of {}", quarter_end);
    println!("  Assets:      {}", sheet.total_assets);
    println!("  Liabilities: {}", sheet.total_liabilities);
    println!("  Equity:      {}", sheet.total_equity);
    println!("  Balanced:    {}\n", sheet.is_balanced);

    let trial = ledger.trial_balance(quarter_end).await?;
    println!("Trial balance");
    for line in trial.balances.values() {
        if let Some(debit) = &line.debit_balance {
            if debit != &BigDecimal::from(0) {
                println!("  {:<6} {:<28} Dr {}", line.account.code, line.account.name, debit);
            }
        }
        if let Some(credit) = &line.credit_balance {
            if credit != &BigDecimal::from(0) {
                println!("  {:<6} {:<28} Cr {}", line.account.code, line.account.name, credit);
            }
        }
    }
    println!("  Totals: Dr {} / Cr {}", trial.total_debits, trial.total_credits);

    let integrity = ledger.validate_integrity(quarter_end).await?;
    println!("\nLedger integrity: {}", if integrity.is_valid { "ok" } else { "issues found" });
    for issue in integrity.issues {
        println!("  - {}", issue);
    }

    Ok(())
}
