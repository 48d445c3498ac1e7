//!
//! Scenario runner.
//!
//! A [`Scenario`] owns one [`ScenarioContext`] and runs named steps against it in order. Each step
//! looks up its fixture by name, issues exactly one request and checks the response. The first
//! failing step halts the scenario: every later step fails with [`ScenarioError::ScenarioHalted`]
//! without touching the transport. Context keys written before the failure are kept.
//!

use std::{fmt, sync::Arc, time::Duration};

use error_stack::{report, ResultExt};
use scenario_env::logger;
use serde_json::Value;
use test_utils::connector_auth::{ConnectorAuthenticationMap, ConnectorPurpose};

use crate::{
    configs::settings::Settings,
    context::ScenarioContext,
    core::{
        admin,
        classifier::Outcome,
        dispatcher::DispatchOutcome,
        mandate::{self, MandateOutcome, MandateSummary},
        payments,
        payouts::{self, PayoutRecord},
    },
    errors::{ScenarioError, ScenarioResult},
    fixtures::{FixtureSet, StepFixture},
    redirection::{RedirectionFlow, RedirectionHandler, RedirectionOutcome, RedirectionOverrides},
    transport::{ReqwestTransport, Transport},
    types::enums::MandateStatus,
};

/// Collaborators shared by every scenario of a run. Holds no scenario state.
#[derive(Clone)]
pub struct ScenarioState {
    pub transport: Arc<dyn Transport>,
    pub redirection_handler: Arc<dyn RedirectionHandler>,
    pub redirection_overrides: RedirectionOverrides,
}

impl fmt::Debug for ScenarioState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScenarioState")
            .field("redirection_overrides", &self.redirection_overrides)
            .finish_non_exhaustive()
    }
}

impl ScenarioState {
    pub fn new(
        transport: Arc<dyn Transport>,
        redirection_handler: Arc<dyn RedirectionHandler>,
        redirection_overrides: RedirectionOverrides,
    ) -> Self {
        Self {
            transport,
            redirection_handler,
            redirection_overrides,
        }
    }

    /// State with a `reqwest` transport configured from `settings`.
    pub fn from_settings(
        settings: &Settings,
        redirection_handler: Arc<dyn RedirectionHandler>,
    ) -> ScenarioResult<Self> {
        let transport = ReqwestTransport::new(Duration::from_secs(settings.request.timeout_secs))
            .change_context(ScenarioError::ConfigurationError(
                "HTTP client could not be built".to_string(),
            ))?;
        Ok(Self::new(
            Arc::new(transport),
            redirection_handler,
            settings.redirection.clone(),
        ))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StepOutcome<T> {
    Completed(T),
    /// The step's fixture carries `TRIGGER_SKIP`
    Skipped,
}

impl<T> StepOutcome<T> {
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}

macro_rules! run_step {
    ($self:ident, $step:expr, |$fixture:ident| $call:expr) => {{
        let Some($fixture) = $self.prepare($step)? else {
            return Ok(StepOutcome::Skipped);
        };
        let result = $call.await;
        $self.finish($step, result)
    }};
}

#[derive(Debug)]
pub struct Scenario {
    name: String,
    context: ScenarioContext,
    state: Arc<ScenarioState>,
    fixtures: Arc<FixtureSet>,
    /// Step that halted the scenario
    halted: Option<String>,
}

impl Scenario {
    pub fn new(
        name: impl Into<String>,
        state: Arc<ScenarioState>,
        fixtures: Arc<FixtureSet>,
        context: ScenarioContext,
    ) -> Self {
        Self {
            name: name.into(),
            context,
            state,
            fixtures,
            halted: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &ScenarioContext {
        &self.context
    }

    pub fn context_mut(&mut self) -> &mut ScenarioContext {
        &mut self.context
    }

    /// Name of the step that failed, if any.
    pub fn halted_at(&self) -> Option<&str> {
        self.halted.as_deref()
    }

    /// Consumes the scenario, returning its final context.
    pub fn into_context(self) -> ScenarioContext {
        self.context
    }

    fn ensure_running(&self, step: &str) -> ScenarioResult<()> {
        match &self.halted {
            Some(failed) => Err(report!(ScenarioError::ScenarioHalted(failed.clone())))
                .attach_printable_lazy(|| format!("step `{step}` was not run")),
            None => Ok(()),
        }
    }

    fn prepare(&mut self, step: &str) -> ScenarioResult<Option<StepFixture>> {
        self.ensure_running(step)?;
        let fixture = match self.fixtures.get(step) {
            Ok(fixture) => fixture.clone(),
            Err(report) => {
                self.halted = Some(step.to_string());
                return Err(report);
            }
        };

        if fixture.configs.trigger_skip {
            logger::info!(scenario = %self.name, step, "step skipped");
            return Ok(None);
        }
        Ok(Some(fixture))
    }

    fn finish<T>(&mut self, step: &str, result: ScenarioResult<T>) -> ScenarioResult<StepOutcome<T>> {
        match result {
            Ok(value) => {
                logger::info!(scenario = %self.name, step, "step passed");
                Ok(StepOutcome::Completed(value))
            }
            Err(report) => {
                logger::error!(
                    scenario = %self.name,
                    step,
                    kind = %report.current_context().kind(),
                    error = ?report,
                    "step failed"
                );
                self.halted = Some(step.to_string());
                Err(report)
            }
        }
    }

    pub async fn merchant_create(&mut self, step: &str) -> ScenarioResult<StepOutcome<bool>> {
        run_step!(self, step, |fixture| admin::merchant_create(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn merchant_retrieve(&mut self, step: &str) -> ScenarioResult<StepOutcome<bool>> {
        run_step!(self, step, |fixture| admin::merchant_retrieve(
            &self.state,
            &self.context,
            &fixture
        ))
    }

    pub async fn merchant_delete(&mut self, step: &str) -> ScenarioResult<StepOutcome<bool>> {
        run_step!(self, step, |fixture| admin::merchant_delete(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn api_key_create(&mut self, step: &str) -> ScenarioResult<StepOutcome<bool>> {
        run_step!(self, step, |fixture| admin::api_key_create(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn customer_create(&mut self, step: &str) -> ScenarioResult<StepOutcome<bool>> {
        run_step!(self, step, |fixture| admin::customer_create(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn connector_create(
        &mut self,
        step: &str,
        credentials: &ConnectorAuthenticationMap,
        purpose: ConnectorPurpose,
    ) -> ScenarioResult<StepOutcome<bool>> {
        run_step!(self, step, |fixture| admin::connector_create(
            &self.state,
            &mut self.context,
            &fixture,
            credentials,
            purpose
        ))
    }

    pub async fn create_payment_intent(&mut self, step: &str) -> ScenarioResult<StepOutcome<Outcome>> {
        run_step!(self, step, |fixture| payments::create_payment_intent(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn confirm_payment(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<DispatchOutcome>> {
        run_step!(self, step, |fixture| payments::confirm_payment(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn create_confirm_payment(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<DispatchOutcome>> {
        run_step!(self, step, |fixture| payments::create_confirm_payment(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn capture_payment(&mut self, step: &str) -> ScenarioResult<StepOutcome<Outcome>> {
        run_step!(self, step, |fixture| payments::capture_payment(
            &self.state,
            &self.context,
            &fixture
        ))
    }

    pub async fn void_payment(&mut self, step: &str) -> ScenarioResult<StepOutcome<Outcome>> {
        run_step!(self, step, |fixture| payments::void_payment(
            &self.state,
            &self.context,
            &fixture
        ))
    }

    pub async fn retrieve_payment(&mut self, step: &str) -> ScenarioResult<StepOutcome<Outcome>> {
        run_step!(self, step, |fixture| payments::retrieve_payment(
            &self.state,
            &self.context,
            &fixture
        ))
    }

    pub async fn refund_payment(&mut self, step: &str) -> ScenarioResult<StepOutcome<Outcome>> {
        run_step!(self, step, |fixture| payments::refund_payment(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn sync_refund(&mut self, step: &str) -> ScenarioResult<StepOutcome<Outcome>> {
        run_step!(self, step, |fixture| payments::sync_refund(
            &self.state,
            &self.context,
            &fixture
        ))
    }

    /// Follows the pending continuation. Has no fixture of its own: the redirection handler
    /// decides what a completed interaction looks like.
    pub async fn follow_continuation(
        &mut self,
        flow: RedirectionFlow,
        expected_url: &str,
        extra: Option<Value>,
    ) -> ScenarioResult<StepOutcome<Option<RedirectionOutcome>>> {
        const STEP: &str = "follow_continuation";
        self.ensure_running(STEP)?;
        let result = payments::follow_continuation(
            &self.state,
            &mut self.context,
            flow,
            expected_url,
            extra,
        )
        .await;
        self.finish(STEP, result)
    }

    pub async fn customer_initiated_mandate(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<MandateOutcome>> {
        run_step!(self, step, |fixture| mandate::customer_initiated(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn merchant_initiated_mandate(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<MandateOutcome>> {
        run_step!(self, step, |fixture| mandate::merchant_initiated(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn revoke_mandate(&mut self, step: &str) -> ScenarioResult<StepOutcome<MandateOutcome>> {
        run_step!(self, step, |fixture| mandate::revoke(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn retrieve_mandate(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<Option<MandateStatus>>> {
        run_step!(self, step, |fixture| mandate::retrieve(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn list_customer_mandates(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<Vec<MandateSummary>>> {
        run_step!(self, step, |fixture| mandate::list_for_customer(
            &self.state,
            &self.context,
            &fixture
        ))
    }

    pub async fn create_payout(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<Option<PayoutRecord>>> {
        run_step!(self, step, |fixture| payouts::create(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn fulfill_payout(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<Option<PayoutRecord>>> {
        run_step!(self, step, |fixture| payouts::fulfill(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn update_payout(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<Option<PayoutRecord>>> {
        run_step!(self, step, |fixture| payouts::update(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn retrieve_payout(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<Option<PayoutRecord>>> {
        run_step!(self, step, |fixture| payouts::retrieve(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }

    pub async fn cancel_payout(
        &mut self,
        step: &str,
    ) -> ScenarioResult<StepOutcome<Option<PayoutRecord>>> {
        run_step!(self, step, |fixture| payouts::cancel(
            &self.state,
            &mut self.context,
            &fixture
        ))
    }
}
