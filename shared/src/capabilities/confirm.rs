use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

/// Asks the user to confirm a destructive action before it is issued.
pub struct Confirm<Ev> {
    context: CapabilityContext<ConfirmRequest, Ev>,
}

impl<Ev> Capability<Ev> for Confirm<Ev> {
    type Operation = ConfirmRequest;
    type MappedSelf<MappedEv> = Confirm<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static + Send,
    {
        Confirm::new(self.context.map_event(f))
    }
}

impl<Ev> Confirm<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<ConfirmRequest, Ev>) -> Self {
        Self { context }
    }

    pub fn ask<F>(&self, request: ConfirmRequest, make_event: F)
    where
        F: FnOnce(bool) -> Ev + Send + 'static,
        Ev: Send,
    {
        let ctx = self.context.clone();
        self.context.spawn(async move {
            let confirmed = ctx.request_from_shell(request).await;
            ctx.update_app(make_event(confirmed));
        });
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
}

impl ConfirmRequest {
    pub fn delete_case(case_id: &str) -> Self {
        Self {
            title: "Delete case".into(),
            message: format!(
                "Delete case {case_id}? All of its files and tasks will be removed. This cannot be undone."
            ),
            confirm_label: "Delete".into(),
        }
    }
}

impl Operation for ConfirmRequest {
    type Output = bool;
}
