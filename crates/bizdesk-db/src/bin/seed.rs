//! # Seed Data Generator
//!
//! Populates a database with a small demo business for development.
//!
//! ## Usage
//! ```bash
//! # Default database ./bizdesk_dev.db
//! cargo run -p bizdesk-db --bin seed
//!
//! # Specify database path and how many sales to ring up
//! cargo run -p bizdesk-db --bin seed -- --db ./data/bizdesk.db --sales 40
//! ```
//!
//! ## Generated Data
//! - A few customers and suppliers
//! - Products across three suppliers, some already near their minimum
//! - Open and paid payables (rent, utilities, restock)
//! - Sales run through the sale workflow, so stock and receivables
//!   line up exactly as they would in production

use bizdesk_core::sale::{LineItemDraft, SaleDraft};
use bizdesk_core::{CustomerKind, PaymentMethod, TenantContext, DEFAULT_TENANT_ID};
use bizdesk_db::{Database, DbConfig, NewCustomer, PayableInput, ProductInput, SupplierInput};
use chrono::{Days, Utc};
use std::env;
use uuid::Uuid;

const CUSTOMERS: &[(&str, CustomerKind)] = &[
    ("Ana Lima", CustomerKind::Individual),
    ("Bruno Costa", CustomerKind::Individual),
    ("Café Central", CustomerKind::Organization),
    ("Mercado Bom Preço", CustomerKind::Organization),
    ("Carla Souza", CustomerKind::Individual),
];

const SUPPLIERS: &[&str] = &["Distribuidora Sul", "Laticínios Serra", "Papelaria Norte"];

/// (name, code, cost, price, stock, min, supplier index)
const PRODUCTS: &[(&str, &str, i64, i64, i64, i64, usize)] = &[
    ("Coffee 500g", "CAF-500", 1_290, 2_190, 60, 10, 0),
    ("Sugar 1kg", "ACU-1K", 390, 649, 80, 15, 0),
    ("Rice 5kg", "ARR-5K", 1_850, 2_790, 25, 8, 0),
    ("Whole Milk 1L", "LEI-1L", 420, 699, 40, 20, 1),
    ("Cheese 250g", "QUE-250", 1_100, 1_890, 12, 10, 1),
    ("Butter 200g", "MAN-200", 780, 1_250, 6, 6, 1),
    ("Notebook A5", "CAD-A5", 650, 1_490, 30, 5, 2),
    ("Ballpoint Pen", "CAN-AZ", 90, 250, 150, 30, 2),
];

const PAYMENT_CYCLE: &[PaymentMethod] = &[
    PaymentMethod::Instant,
    PaymentMethod::CardDebit,
    PaymentMethod::CardCredit,
    PaymentMethod::Instant,
    PaymentMethod::Deferred,
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut sale_count: usize = 20;
    let mut db_path = String::from("./bizdesk_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sale_count = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("BizDesk Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sales <N>    Number of sales to create (default: 20)");
                println!("  -d, --db <PATH>    Database file path (default: ./bizdesk_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 BizDesk Seed Data Generator");
    println!("==============================");
    println!("Database: {}", db_path);
    println!("Sales:    {}", sale_count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    let ctx = TenantContext::new(DEFAULT_TENANT_ID, Uuid::new_v4().to_string())?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.products().list(&ctx, true).await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} products", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let mut customer_ids = Vec::new();
    for (name, kind) in CUSTOMERS {
        let customer = db
            .customers()
            .create(
                &ctx,
                NewCustomer {
                    name: name.to_string(),
                    kind: *kind,
                    ..Default::default()
                },
            )
            .await?;
        customer_ids.push(customer.id);
    }
    println!("✓ {} customers", customer_ids.len());

    let mut supplier_ids = Vec::new();
    for name in SUPPLIERS {
        let supplier = db
            .suppliers()
            .create(
                &ctx,
                SupplierInput {
                    name: name.to_string(),
                    ..Default::default()
                },
            )
            .await?;
        supplier_ids.push(supplier.id);
    }
    println!("✓ {} suppliers", supplier_ids.len());

    let mut products = Vec::new();
    for &(name, code, cost, price, stock, min, supplier) in PRODUCTS {
        let product = db
            .products()
            .create(
                &ctx,
                ProductInput {
                    name: name.to_string(),
                    code: Some(code.to_string()),
                    cost_price_cents: cost,
                    sale_price_cents: price,
                    current_stock: stock,
                    min_stock: min,
                    supplier_id: supplier_ids.get(supplier).cloned(),
                    ..ProductInput::default()
                },
            )
            .await?;
        products.push(product);
    }
    println!("✓ {} products", products.len());

    let today = Utc::now().date_naive();
    let bills = [
        ("Shop rent", "rent", 180_000, 5_u64, true),
        ("Electricity", "utilities", 32_000, 10, true),
        ("Restock dairy", "inventory", 54_000, 20, false),
    ];
    for (description, category, amount, days_ago, paid) in bills {
        let due = today.checked_sub_days(Days::new(days_ago)).unwrap_or(today);
        let payable = db
            .payables()
            .create(
                &ctx,
                PayableInput {
                    supplier_id: None,
                    description: description.to_string(),
                    category: Some(category.to_string()),
                    amount_cents: amount,
                    due_date: due,
                    notes: None,
                },
            )
            .await?;
        if paid {
            db.payables().mark_paid(&ctx, &payable.id, due).await?;
        }
    }
    println!("✓ {} payables", bills.len());

    println!();
    println!("Creating sales...");

    let workflow = db.sale_workflow(Some(30));
    let start = std::time::Instant::now();
    let mut created = 0;

    for n in 0..sale_count {
        let first = &products[n % products.len()];
        let second = &products[(n * 3 + 1) % products.len()];
        let mut items = vec![LineItemDraft {
            product_id: first.id.clone(),
            quantity: 1 + (n % 3) as i64,
            unit_price_cents: first.sale_price_cents,
        }];
        if second.id != first.id {
            items.push(LineItemDraft {
                product_id: second.id.clone(),
                quantity: 1,
                unit_price_cents: second.sale_price_cents,
            });
        }

        let draft = SaleDraft {
            customer_id: customer_ids[n % customer_ids.len()].clone(),
            items,
            discount_cents: if n % 4 == 0 { 100 } else { 0 },
            payment_method: PAYMENT_CYCLE[n % PAYMENT_CYCLE.len()],
            due_date: None,
            payment_terms: None,
            notes: None,
            request_id: None,
        };

        // Back-date so the growth chart has history.
        let months_back = (n % 6) as u32;
        let at = Utc::now()
            .checked_sub_days(Days::new(u64::from(months_back) * 30))
            .unwrap_or_else(Utc::now);

        match workflow.create_sale_at(&ctx, &draft, at).await {
            Ok(_) => created += 1,
            Err(e) => eprintln!("Sale {} skipped: {}", n, e),
        }
    }

    let elapsed = start.elapsed();
    println!("✓ Created {} sales in {:?}", created, elapsed);

    let low = db.products().low_stock(&ctx).await?;
    println!("  Low stock: {} products", low.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
