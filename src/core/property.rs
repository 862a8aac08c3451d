use super::types::{ProjectionParameters, PurchaseEvent};

/// Property and mortgage position carried from one simulated year to the next.
///
/// Starts unowned. Once a purchase happens the event is fixed and the module only
/// compounds value and amortizes the mortgage; there is no sale or default.
#[derive(Debug, Clone, Default)]
pub(crate) struct PropertyState {
    purchase: Option<PurchaseEvent>,
    value: f64,
    mortgage: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub(crate) struct PropertySnapshot {
    pub value: f64,
    pub mortgage: f64,
    pub equity: f64,
}

impl PropertyState {
    pub fn owned(&self) -> bool {
        self.purchase.is_some()
    }

    pub fn purchase(&self) -> Option<PurchaseEvent> {
        self.purchase
    }

    /// Advances one year. `lisa` is the locked account after this year's growth,
    /// contributions and bonus; a purchase debits the deposit from it.
    pub fn step(
        &mut self,
        params: &ProjectionParameters,
        year: u32,
        lisa: &mut f64,
    ) -> PropertySnapshot {
        match self.purchase {
            Some(event) => {
                self.value *= real_growth_factor(params.house_price_growth, params.inflation_rate);
                self.mortgage = (self.mortgage * (1.0 + real_mortgage_rate(params))
                    - event.annual_repayment)
                    .max(0.0);
            }
            None => {
                if params.property_price_start <= 0.0 {
                    return PropertySnapshot::default();
                }

                let price = house_price(params, year);
                let deposit = price * params.deposit_rate;
                if *lisa < deposit {
                    return PropertySnapshot::default();
                }

                let initial_mortgage = price - deposit;
                let event = PurchaseEvent {
                    year,
                    age: params.age_at(year),
                    price,
                    deposit,
                    initial_mortgage,
                    annual_repayment: initial_mortgage / params.mortgage_term_years as f64,
                };
                *lisa -= deposit;
                self.value = price;
                self.mortgage = initial_mortgage;
                self.purchase = Some(event);

                tracing::debug!(
                    year,
                    age = event.age,
                    price,
                    deposit,
                    "property purchase triggered"
                );
            }
        }

        PropertySnapshot {
            value: self.value,
            mortgage: self.mortgage,
            equity: self.value - self.mortgage,
        }
    }
}

/// Real house price `year` years after the start.
pub fn house_price(params: &ProjectionParameters, year: u32) -> f64 {
    params.property_price_start
        * real_growth_factor(params.house_price_growth, params.inflation_rate).powi(year as i32)
}

pub fn deposit_required(params: &ProjectionParameters, year: u32) -> f64 {
    house_price(params, year) * params.deposit_rate
}

/// Mortgage rate net of inflation, `(1 + nominal) / (1 + inflation) - 1`.
pub fn real_mortgage_rate(params: &ProjectionParameters) -> f64 {
    (1.0 + params.mortgage_rate) / (1.0 + params.inflation_rate) - 1.0
}

pub(crate) fn real_growth_factor(nominal_rate: f64, inflation: f64) -> f64 {
    1.0 + nominal_rate - inflation
}
