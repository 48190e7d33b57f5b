//! # Report Commands
//!
//! Fetch the rows a report needs, then hand them to the pure engine in
//! `bizdesk_core::reports`. Nothing is cached here; every call recomputes.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  command                    rows fetched              engine fn         │
//! │  ─────────────────────────  ────────────────────────  ────────────────  │
//! │  compute_monthly_snapshot   sales, paid payables      monthly_snapshot  │
//! │  compute_growth_series      sales (window)            growth_series     │
//! │  compute_top_products       sales, items, products    top_products      │
//! │  compute_product_margins    active products           product_margins   │
//! │  list_low_stock             products at/below min     low_stock         │
//! │  dashboard                  all of the above + open   dashboard         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use bizdesk_core::reports::snapshot::MAX_GROWTH_WINDOW_MONTHS;
use bizdesk_core::reports::{
    self, DashboardData, DashboardSummary, FinancialSnapshot, GrowthPoint, LowStockAlert, ProductMargin,
    ProductRanking, RankingMetric,
};
use bizdesk_core::{Period, TenantContext};
use chrono::NaiveDate;
use tracing::debug;

use crate::error::ApiError;
use crate::state::AppState;

/// Revenue, expense and profit for the calendar month containing `month`.
pub async fn compute_monthly_snapshot(
    state: &AppState,
    ctx: &TenantContext,
    month: NaiveDate,
) -> Result<FinancialSnapshot, ApiError> {
    let period = Period::month_of(month);
    debug!(month = %period.month_label(), "compute_monthly_snapshot command");

    let sales = state.db().sales().list_in_period(ctx, &period).await?;
    let payables = state.db().payables().paid_in_period(ctx, &period).await?;

    Ok(reports::monthly_snapshot(period, &sales, &payables))
}

/// Month-over-month series ending with the month of `today`, oldest first.
///
/// `month_count` defaults to `finance.growth_window_months`.
pub async fn compute_growth_series(
    state: &AppState,
    ctx: &TenantContext,
    today: NaiveDate,
    month_count: Option<u32>,
) -> Result<Vec<GrowthPoint>, ApiError> {
    let months = month_count.unwrap_or(state.config().finance.growth_window_months);
    debug!(months, "compute_growth_series command");
    if !(1..=MAX_GROWTH_WINDOW_MONTHS).contains(&months) {
        return Err(ApiError::validation(format!(
            "month count must be between 1 and {MAX_GROWTH_WINDOW_MONTHS}, got {months}"
        )));
    }

    let window = Period {
        start: Period::month_offset(today, 1 - months as i32).start,
        end: Period::month_of(today).end,
    };
    let sales = state.db().sales().list_in_period(ctx, &window).await?;

    Ok(reports::growth_series(today, months, &sales))
}

pub async fn compute_top_products(
    state: &AppState,
    ctx: &TenantContext,
    period: Period,
    metric: RankingMetric,
    limit: Option<usize>,
) -> Result<Vec<ProductRanking>, ApiError> {
    debug!(start = %period.start, end = %period.end, ?metric, ?limit, "compute_top_products command");

    let sales = state.db().sales().list_in_period(ctx, &period).await?;
    let items = state.db().sales().items_in_period(ctx, &period).await?;
    // Inactive products still have sales history worth ranking.
    let products = state.db().products().list(ctx, true).await?;

    Ok(reports::top_products(period, &sales, &items, &products, metric, limit))
}

pub async fn compute_product_margins(state: &AppState, ctx: &TenantContext) -> Result<Vec<ProductMargin>, ApiError> {
    debug!("compute_product_margins command");
    let products = state.db().products().list(ctx, false).await?;
    Ok(reports::product_margins(&products))
}

/// Active products at or below their minimum, emptiest first.
pub async fn list_low_stock(state: &AppState, ctx: &TenantContext) -> Result<Vec<LowStockAlert>, ApiError> {
    debug!("list_low_stock command");
    let products = state.db().products().low_stock(ctx).await?;
    Ok(reports::low_stock(&products))
}

/// Home-screen summary as of `today`.
pub async fn dashboard(state: &AppState, ctx: &TenantContext, today: NaiveDate) -> Result<DashboardSummary, ApiError> {
    let finance = &state.config().finance;
    debug!(today = %today, "dashboard command");

    // One sales read covering the month, the 7-day chart and the
    // active-customer window.
    let month = Period::month_of(today);
    let active_start = Period::month_offset(today, 1 - finance.active_customer_months.max(1) as i32).start;
    let window = Period {
        start: active_start.min(Period::last_days(today, 7).start),
        end: month.end,
    };

    let db = state.db();
    let data = DashboardData {
        sales: db.sales().list_in_period(ctx, &window).await?,
        products: db.products().list(ctx, false).await?,
        recent_sales: db.sales().recent_finalized(ctx, finance.recent_sales_limit).await?,
        receivables: db.receivables().list_open(ctx).await?,
        payables: db.payables().list_open(ctx).await?,
    };

    Ok(reports::dashboard(today, &data, finance.active_customer_months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::sale::{cancel_sale, create_sale};
    use crate::error::ErrorCode;
    use crate::state::test_support::*;
    use bizdesk_core::{Money, PaymentMethod, StockStatus};
    use bizdesk_db::PayableInput;
    use chrono::Utc;

    #[tokio::test]
    async fn test_snapshot_and_growth() {
        let (state, ctx) = setup().await;
        let c = customer(&state, &ctx, "Ana").await;
        let p = product(&state, &ctx, "Coffee", 50, 0).await;

        create_sale(&state, &ctx, draft(&c.id, &p.id, 2, PaymentMethod::Instant)).await.unwrap();
        let dropped = create_sale(&state, &ctx, draft(&c.id, &p.id, 9, PaymentMethod::Instant))
            .await
            .unwrap();
        cancel_sale(&state, &ctx, &dropped.id).await.unwrap();

        let today = Utc::now().date_naive();
        let bill = state
            .db()
            .payables()
            .create(
                &ctx,
                PayableInput {
                    supplier_id: None,
                    description: "Electricity".into(),
                    category: Some("utilities".into()),
                    amount_cents: 500,
                    due_date: today,
                    notes: None,
                },
            )
            .await
            .unwrap();
        state.db().payables().mark_paid(&ctx, &bill.id, today).await.unwrap();

        let snapshot = compute_monthly_snapshot(&state, &ctx, today).await.unwrap();
        assert_eq!(snapshot.revenue, Money::from_cents(2_000));
        assert_eq!(snapshot.expense, Money::from_cents(500));
        assert_eq!(snapshot.net_profit, Money::from_cents(1_500));
        assert_eq!(snapshot.profit_margin_pct, 75.0);
        assert_eq!(snapshot.sale_count, 1);

        let growth = compute_growth_series(&state, &ctx, today, None).await.unwrap();
        assert_eq!(growth.len(), 7);
        assert_eq!(growth[6].revenue, Money::from_cents(2_000));
        assert_eq!(growth[6].sale_count, 1);
        // Nothing the month before, so no growth figure.
        assert_eq!(growth[6].revenue_growth_pct, 0.0);

        let quarter = compute_growth_series(&state, &ctx, today, Some(3)).await.unwrap();
        assert_eq!(quarter.len(), 3);
        assert_eq!(quarter[2].revenue, Money::from_cents(2_000));

        for bad in [0, 61] {
            let err = compute_growth_series(&state, &ctx, today, Some(bad)).await.unwrap_err();
            assert_eq!(err.code, ErrorCode::ValidationFailed);
        }
    }

    #[tokio::test]
    async fn test_top_products_and_margins() {
        let (state, ctx) = setup().await;
        let c = customer(&state, &ctx, "Ana").await;
        let coffee = product(&state, &ctx, "Coffee", 50, 0).await;
        let sugar = product(&state, &ctx, "Sugar", 50, 0).await;

        create_sale(&state, &ctx, draft(&c.id, &coffee.id, 1, PaymentMethod::Instant)).await.unwrap();
        create_sale(&state, &ctx, draft(&c.id, &sugar.id, 4, PaymentMethod::CardDebit)).await.unwrap();

        let month = Period::month_of(Utc::now().date_naive());
        let ranking = compute_top_products(&state, &ctx, month, RankingMetric::Quantity, Some(5))
            .await
            .unwrap();
        assert_eq!(ranking.len(), 2);
        assert_eq!(ranking[0].product_id, sugar.id);
        assert_eq!(ranking[0].quantity, 4);
        assert_eq!(ranking[0].revenue, Money::from_cents(4_000));
        assert_eq!(ranking[0].margin, Money::from_cents(1_600));

        let top_one = compute_top_products(&state, &ctx, month, RankingMetric::Revenue, Some(1))
            .await
            .unwrap();
        assert_eq!(top_one.len(), 1);

        let margins = compute_product_margins(&state, &ctx).await.unwrap();
        assert_eq!(margins.len(), 2);
        assert_eq!(margins[0].margin, Money::from_cents(400));
        // (10.00 - 6.00) / 6.00
        assert!((margins[0].margin_pct - 66.666).abs() < 0.01);
    }

    #[tokio::test]
    async fn test_low_stock_and_dashboard() {
        let (state, ctx) = setup().await;
        let ana = customer(&state, &ctx, "Ana").await;
        let bruno = customer(&state, &ctx, "Bruno").await;
        let milk = product(&state, &ctx, "Milk", 5, 5).await;
        let rice = product(&state, &ctx, "Rice", 40, 5).await;

        create_sale(&state, &ctx, draft(&ana.id, &milk.id, 5, PaymentMethod::Instant)).await.unwrap();
        create_sale(&state, &ctx, draft(&bruno.id, &rice.id, 1, PaymentMethod::Deferred)).await.unwrap();

        let low = list_low_stock(&state, &ctx).await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product.id, milk.id);
        assert_eq!(low[0].status, StockStatus::Out);

        let today = Utc::now().date_naive();
        let summary = dashboard(&state, &ctx, today).await.unwrap();
        assert_eq!(summary.month_sale_count, 2);
        assert_eq!(summary.month_revenue, Money::from_cents(6_000));
        assert_eq!(summary.active_customers, 2);
        assert_eq!(summary.low_stock_count, 1);
        assert_eq!(summary.recent_sales.len(), 2);
        assert_eq!(summary.daily_sales.len(), 7);
        assert_eq!(summary.daily_sales[6].sale_count, 2);
        assert_eq!(summary.receivables_open, Money::from_cents(1_000));
        assert_eq!(summary.open_accounts.len(), 1);
    }
}
