//! Product rankings: best sellers over a period and the catalog margin table.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::period::Period;
use crate::types::{LineItem, Product, Sale};

/// What `top_products` sorts by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum RankingMetric {
    Quantity,
    Revenue,
    Margin,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductRanking {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    /// Σ line subtotals (snapshot prices).
    pub revenue: Money,
    /// (catalog sale price − cost price) × quantity.
    pub margin: Money,
    /// Unit margin / cost price × 100; 0 when cost is 0.
    pub margin_pct: f64,
}

/// Groups the line items of finalized sales inside `period` by product and
/// sorts descending by `metric`.
///
/// Margins use the catalog prices of `products`. A line whose product is
/// not in `products` keeps its name snapshot and contributes no margin.
pub fn top_products(
    period: Period,
    sales: &[Sale],
    items: &[LineItem],
    products: &[Product],
    metric: RankingMetric,
    limit: Option<usize>,
) -> Vec<ProductRanking> {
    let counted: HashSet<&str> = sales
        .iter()
        .filter(|s| s.is_finalized() && period.contains(s.sale_date()))
        .map(|s| s.id.as_str())
        .collect();
    let catalog: HashMap<&str, &Product> = products.iter().map(|p| (p.id.as_str(), p)).collect();

    let mut grouped: BTreeMap<&str, ProductRanking> = BTreeMap::new();
    for item in items.iter().filter(|i| counted.contains(i.sale_id.as_str())) {
        let product = catalog.get(item.product_id.as_str()).copied();
        let entry = grouped
            .entry(item.product_id.as_str())
            .or_insert_with(|| ProductRanking {
                product_id: item.product_id.clone(),
                product_name: product
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|| item.product_name.clone()),
                quantity: 0,
                revenue: Money::zero(),
                margin: Money::zero(),
                margin_pct: product
                    .map(|p| p.unit_margin().percent_of(p.cost_price()))
                    .unwrap_or(0.0),
            });

        entry.quantity += item.quantity;
        entry.revenue += item.subtotal();
        if let Some(p) = product {
            entry.margin += p.unit_margin().multiply_quantity(item.quantity);
        }
    }

    let mut ranked: Vec<ProductRanking> = grouped.into_values().collect();
    ranked.sort_by(|a, b| {
        let primary = match metric {
            RankingMetric::Quantity => b.quantity.cmp(&a.quantity),
            RankingMetric::Revenue => b.revenue.cmp(&a.revenue),
            RankingMetric::Margin => b.margin.cmp(&a.margin),
        };
        primary
            .then_with(|| a.product_name.cmp(&b.product_name))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });

    if let Some(n) = limit {
        ranked.truncate(n);
    }
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductMargin {
    pub product_id: String,
    pub product_name: String,
    pub cost_price: Money,
    pub sale_price: Money,
    pub margin: Money,
    pub margin_pct: f64,
}

/// Unit margin of every active product, highest percentage first.
pub fn product_margins(products: &[Product]) -> Vec<ProductMargin> {
    let mut rows: Vec<ProductMargin> = products
        .iter()
        .filter(|p| p.is_active)
        .map(|p| ProductMargin {
            product_id: p.id.clone(),
            product_name: p.name.clone(),
            cost_price: p.cost_price(),
            sale_price: p.sale_price(),
            margin: p.unit_margin(),
            margin_pct: p.unit_margin().percent_of(p.cost_price()),
        })
        .collect();

    rows.sort_by(|a, b| {
        b.margin_pct
            .partial_cmp(&a.margin_pct)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.product_name.cmp(&b.product_name))
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    rows
}
