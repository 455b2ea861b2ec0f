//! Simulated broker backed by a data handler and an exchange-hours model.

use super::{Broker, BrokerContext, BrokerError, Holding, SimPortfolio, MASTER_KEY};
use crate::data::DataHandler;
use crate::domain::{Order, Timestamp, Transaction};
use crate::exchange::SimulatedExchange;
use crate::fees::FeeModel;
use std::collections::{BTreeMap, VecDeque};

/// Backtest brokerage.
///
/// Orders submitted while the exchange is open fill immediately; otherwise
/// they queue and fill, in submission order, on the first [`Broker::update`]
/// at which the exchange is open. Fills use the data handler's price at the
/// fill instant and are charged by the fee model.
pub struct SimulatedBroker {
    account_id: String,
    exchange: SimulatedExchange,
    data: Box<dyn DataHandler>,
    fee_model: Box<dyn FeeModel>,
    current_time: Option<Timestamp>,
    cash: f64,
    portfolios: BTreeMap<String, SimPortfolio>,
    open_orders: VecDeque<(String, Order)>,
}

impl std::fmt::Debug for SimulatedBroker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SimulatedBroker")
            .field("account_id", &self.account_id)
            .field("fee_model", &self.fee_model.name())
            .field("current_time", &self.current_time)
            .field("cash", &self.cash)
            .field("portfolios", &self.portfolios.keys().collect::<Vec<_>>())
            .field("open_orders", &self.open_orders.len())
            .finish()
    }
}

impl SimulatedBroker {
    pub fn new(
        account_id: impl Into<String>,
        exchange: SimulatedExchange,
        data: Box<dyn DataHandler>,
        fee_model: Box<dyn FeeModel>,
        initial_funds: f64,
    ) -> Result<Self, BrokerError> {
        check_amount(initial_funds)?;
        Ok(Self {
            account_id: account_id.into(),
            exchange,
            data,
            fee_model,
            current_time: None,
            cash: initial_funds,
            portfolios: BTreeMap::new(),
            open_orders: VecDeque::new(),
        })
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn fee_model(&self) -> &dyn FeeModel {
        self.fee_model.as_ref()
    }

    /// Orders waiting for the exchange to open.
    pub fn open_orders(&self) -> impl Iterator<Item = &(String, Order)> {
        self.open_orders.iter()
    }

    pub fn portfolio(&self, id: &str) -> Result<&SimPortfolio, BrokerError> {
        self.portfolios
            .get(id)
            .ok_or_else(|| BrokerError::UnknownPortfolio(id.to_string()))
    }

    fn execute_order(&mut self, ts: Timestamp, portfolio_id: &str, order: Order) {
        let Some(price) = self.data.latest_price(&order.asset, ts) else {
            tracing::warn!(
                asset = %order.asset,
                quantity = order.quantity,
                %ts,
                "no price available; order dropped"
            );
            return;
        };
        let consideration = price * order.quantity;
        let cost = self.fee_model.calc_total_cost(
            &order.asset,
            order.quantity,
            consideration,
            Some(&*self as &dyn BrokerContext),
        );

        let Some(portfolio) = self.portfolios.get_mut(portfolio_id) else {
            return;
        };
        tracing::debug!(
            portfolio = portfolio_id,
            asset = %order.asset,
            quantity = order.quantity,
            price,
            cost,
            "order filled"
        );
        portfolio.transact(Transaction {
            timestamp: ts,
            asset: order.asset,
            quantity: order.quantity,
            price,
            cost,
        });
    }

    fn mark_to_market(&mut self, ts: Timestamp) {
        let data = &self.data;
        for portfolio in self.portfolios.values_mut() {
            let marks: Vec<(String, f64)> = portfolio
                .assets()
                .filter_map(|a| data.latest_price(a, ts).map(|p| (a.to_string(), p)))
                .collect();
            for (asset, price) in marks {
                portfolio.update_market_value(&asset, price);
            }
        }
    }
}

fn check_amount(amount: f64) -> Result<f64, BrokerError> {
    if amount >= 0.0 && amount.is_finite() {
        Ok(amount)
    } else {
        Err(BrokerError::NegativeAmount(amount))
    }
}

impl BrokerContext for SimulatedBroker {
    fn current_time(&self) -> Option<Timestamp> {
        self.current_time
    }

    fn account_cash(&self) -> f64 {
        self.cash
    }
}

impl Broker for SimulatedBroker {
    fn update(&mut self, ts: Timestamp) -> Result<(), BrokerError> {
        self.current_time = Some(ts);
        if self.exchange.is_open_at(ts) {
            while let Some((portfolio_id, order)) = self.open_orders.pop_front() {
                self.execute_order(ts, &portfolio_id, order);
            }
        }
        self.mark_to_market(ts);
        Ok(())
    }

    fn subscribe_funds_to_account(&mut self, amount: f64) -> Result<(), BrokerError> {
        self.cash += check_amount(amount)?;
        Ok(())
    }

    fn create_portfolio(&mut self, id: &str, name: &str) -> Result<(), BrokerError> {
        if self.portfolios.contains_key(id) {
            return Err(BrokerError::DuplicatePortfolio(id.to_string()));
        }
        self.portfolios
            .insert(id.to_string(), SimPortfolio::new(id, name, self.current_time));
        tracing::debug!(account = %self.account_id, portfolio = id, name, "portfolio created");
        Ok(())
    }

    fn subscribe_funds_to_portfolio(&mut self, id: &str, amount: f64) -> Result<(), BrokerError> {
        let amount = check_amount(amount)?;
        if amount > self.cash {
            return Err(BrokerError::InsufficientCash {
                requested: amount,
                available: self.cash,
            });
        }
        let portfolio = self
            .portfolios
            .get_mut(id)
            .ok_or_else(|| BrokerError::UnknownPortfolio(id.to_string()))?;
        portfolio.subscribe_funds(amount);
        self.cash -= amount;
        Ok(())
    }

    fn submit_order(&mut self, portfolio_id: &str, order: Order) -> Result<(), BrokerError> {
        if !self.portfolios.contains_key(portfolio_id) {
            return Err(BrokerError::UnknownPortfolio(portfolio_id.to_string()));
        }
        if !order.quantity.is_finite() || order.quantity == 0.0 {
            return Err(BrokerError::InvalidOrder {
                asset: order.asset,
                quantity: order.quantity,
            });
        }

        let open_now = self
            .current_time
            .filter(|ts| self.exchange.is_open_at(*ts));
        match open_now {
            Some(ts) => self.execute_order(ts, portfolio_id, order),
            None => {
                tracing::debug!(
                    portfolio = portfolio_id,
                    asset = %order.asset,
                    quantity = order.quantity,
                    "exchange closed; order queued"
                );
                self.open_orders.push_back((portfolio_id.to_string(), order));
            }
        }
        Ok(())
    }

    fn account_total_equity(&self) -> BTreeMap<String, f64> {
        let mut equity: BTreeMap<String, f64> = self
            .portfolios
            .iter()
            .map(|(id, p)| (id.clone(), p.total_equity()))
            .collect();
        let master = self.cash + equity.values().sum::<f64>();
        equity.insert(MASTER_KEY.to_string(), master);
        equity
    }

    fn portfolio_total_equity(&self, id: &str) -> Result<f64, BrokerError> {
        self.portfolio(id).map(SimPortfolio::total_equity)
    }

    fn portfolio_cash(&self, id: &str) -> Result<f64, BrokerError> {
        self.portfolio(id).map(SimPortfolio::cash)
    }

    fn holdings(&self, id: &str) -> Result<Vec<Holding>, BrokerError> {
        self.portfolio(id).map(SimPortfolio::holdings)
    }

    fn transactions(&self, id: &str) -> Result<Vec<Transaction>, BrokerError> {
        self.portfolio(id).map(|p| p.transactions().to_vec())
    }

    fn holdings_report(&self, id: &str) -> Result<String, BrokerError> {
        self.portfolio(id).map(SimPortfolio::holdings_report)
    }

    fn latest_price(&self, asset: &str) -> Option<f64> {
        self.data.latest_price(asset, self.current_time?)
    }

    fn data_handler(&self) -> &dyn DataHandler {
        self.data.as_ref()
    }
}
