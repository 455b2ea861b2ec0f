//! Quant trading system: alpha → risk → portfolio construction → orders.

use super::{AlphaModel, PortfolioMode, RiskModel, TargetAllocation, TradingError, TradingSystem};
use crate::broker::Broker;
use crate::domain::{Order, StaticUniverse, Timestamp};
use crate::signals::SignalsCollection;
use std::collections::BTreeMap;

/// Default trading system driven by an alpha model.
///
/// At each rebalance:
/// 1. the alpha model produces raw weights, optionally adjusted by the risk model;
/// 2. the weights are recorded as the target allocation (universe assets
///    without a signal carry 0);
/// 3. weights are scaled by the [`PortfolioMode`] and sized against the
///    portfolio's total equity: `quantity = trunc(weight * equity / price)`;
/// 4. the difference against current holdings is submitted, sells first.
pub struct QuantTradingSystem {
    universe: StaticUniverse,
    portfolio_id: String,
    alpha_model: Box<dyn AlphaModel>,
    risk_model: Option<Box<dyn RiskModel>>,
    mode: PortfolioMode,
    submit_orders: bool,
}

impl QuantTradingSystem {
    pub fn new(
        universe: StaticUniverse,
        portfolio_id: impl Into<String>,
        alpha_model: Box<dyn AlphaModel>,
        risk_model: Option<Box<dyn RiskModel>>,
        mode: PortfolioMode,
    ) -> Self {
        Self {
            universe,
            portfolio_id: portfolio_id.into(),
            alpha_model,
            risk_model,
            mode,
            submit_orders: true,
        }
    }

    /// Compute targets without sending orders to the broker.
    pub fn without_orders(mut self) -> Self {
        self.submit_orders = false;
        self
    }

    pub fn mode(&self) -> PortfolioMode {
        self.mode
    }

    pub fn universe(&self) -> &StaticUniverse {
        &self.universe
    }

    fn target_weights(
        &mut self,
        ts: Timestamp,
        signals: Option<&dyn SignalsCollection>,
    ) -> Result<BTreeMap<String, f64>, TradingError> {
        let mut weights = self.alpha_model.signals(ts, &self.universe, signals);
        if let Some((asset, _)) = weights.iter().find(|(_, w)| !w.is_finite()) {
            return Err(TradingError::NonFiniteWeight {
                model: self.alpha_model.name().to_string(),
                asset: asset.clone(),
            });
        }
        if let Some(risk) = self.risk_model.as_mut() {
            weights = risk.adjust(ts, weights);
        }

        let mut full: BTreeMap<String, f64> = self
            .universe
            .assets()
            .iter()
            .map(|a| (a.clone(), 0.0))
            .collect();
        full.extend(weights);
        Ok(full)
    }

    fn generate_orders(
        &self,
        weights: &BTreeMap<String, f64>,
        broker: &dyn Broker,
    ) -> Result<Vec<Order>, TradingError> {
        let equity = broker.portfolio_total_equity(&self.portfolio_id)?;
        let current: BTreeMap<String, f64> = broker
            .holdings(&self.portfolio_id)?
            .into_iter()
            .map(|h| (h.asset, h.quantity))
            .collect();

        let scaled = self.mode.scale(weights);
        let mut assets: Vec<&String> = scaled.keys().chain(current.keys()).collect();
        assets.sort();
        assets.dedup();

        let mut orders = Vec::new();
        for asset in assets {
            let weight = scaled.get(asset).copied().unwrap_or(0.0);
            let held = current.get(asset).copied().unwrap_or(0.0);
            let target = if weight == 0.0 || equity <= 0.0 {
                0.0
            } else {
                match broker.latest_price(asset) {
                    Some(price) if price > 0.0 => (weight * equity / price).trunc(),
                    _ => {
                        tracing::warn!(%asset, weight, "no price available; position left unchanged");
                        continue;
                    }
                }
            };
            let delta = target - held;
            if delta != 0.0 {
                orders.push(Order::new(asset.clone(), delta));
            }
        }

        // free up cash before buying
        orders.sort_by_key(|o| o.is_buy());
        Ok(orders)
    }
}

impl TradingSystem for QuantTradingSystem {
    fn rebalance(
        &mut self,
        ts: Timestamp,
        broker: &mut dyn Broker,
        signals: Option<&dyn SignalsCollection>,
    ) -> Result<Vec<TargetAllocation>, TradingError> {
        let weights = self.target_weights(ts, signals)?;

        if self.submit_orders {
            let orders = self.generate_orders(&weights, broker)?;
            tracing::debug!(%ts, orders = orders.len(), "rebalance orders generated");
            for order in orders {
                broker.submit_order(&self.portfolio_id, order)?;
            }
        }

        Ok(vec![TargetAllocation {
            timestamp: ts,
            weights,
        }])
    }
}
