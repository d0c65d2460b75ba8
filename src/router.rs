//! Dispatch of admitted records to event handlers.
//!
//! Three routes exist: motion, illuminance and a generic update that sees
//! every record. Each route has at most one handler, chosen when the router is
//! built. Routes are checked independently in a fixed order, so a missing or
//! failing handler never keeps the others from running.

use crate::admission::AdmittedRecord;
use crate::schema::FieldKind;
use std::fmt;
use std::io;
use thiserror::Error;

/// Errors raised by event handlers.
#[derive(Error, Debug)]
pub enum HandlerError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error("actuator error: {0}")]
    Actuator(String),
}

/// Something that reacts to admitted records.
pub trait Handler {
    fn handle(&mut self, record: &AdmittedRecord) -> Result<(), HandlerError>;
}

impl<F> Handler for F
where
    F: FnMut(&AdmittedRecord) -> Result<(), HandlerError>,
{
    fn handle(&mut self, record: &AdmittedRecord) -> Result<(), HandlerError> {
        self(record)
    }
}

/// Event routes, in dispatch order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    Motion,
    Illuminance,
    Update,
}

impl Route {
    /// Whether this route applies to the record.
    pub fn matches(self, record: &AdmittedRecord) -> bool {
        match self {
            Route::Motion => record.record.contains(FieldKind::Motion.name()),
            Route::Illuminance => record.record.contains(FieldKind::Illuminance.name()),
            Route::Update => true,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Motion => write!(f, "motion"),
            Route::Illuminance => write!(f, "illuminance"),
            Route::Update => write!(f, "update"),
        }
    }
}

/// A handler failure, tagged with the route it happened on.
#[derive(Error, Debug)]
#[error("{route} handler failed for {address}: {source}")]
pub struct RouteError {
    pub route: Route,
    pub address: String,
    #[source]
    pub source: HandlerError,
}

type BoxedHandler<'a> = Box<dyn Handler + 'a>;

/// Routes admitted records to the registered handlers.
pub struct Router<'a> {
    motion: Option<BoxedHandler<'a>>,
    illuminance: Option<BoxedHandler<'a>>,
    update: Option<BoxedHandler<'a>>,
}

impl<'a> Router<'a> {
    pub fn new() -> Self {
        Router {
            motion: None,
            illuminance: None,
            update: None,
        }
    }

    /// Handler for records that carry a `motion` field.
    pub fn on_motion(mut self, handler: impl Handler + 'a) -> Self {
        self.motion = Some(Box::new(handler));
        self
    }

    /// Handler for records that carry an `illuminance` field.
    pub fn on_illuminance(mut self, handler: impl Handler + 'a) -> Self {
        self.illuminance = Some(Box::new(handler));
        self
    }

    /// Handler for every admitted record.
    pub fn on_update(mut self, handler: impl Handler + 'a) -> Self {
        self.update = Some(Box::new(handler));
        self
    }

    fn handler(&mut self, route: Route) -> Option<&mut BoxedHandler<'a>> {
        match route {
            Route::Motion => self.motion.as_mut(),
            Route::Illuminance => self.illuminance.as_mut(),
            Route::Update => self.update.as_mut(),
        }
    }

    /// Invoke every matching handler and collect their failures.
    pub fn dispatch(&mut self, record: &AdmittedRecord) -> Vec<RouteError> {
        let mut errors = Vec::new();

        for route in [Route::Motion, Route::Illuminance, Route::Update] {
            if !route.matches(record) {
                continue;
            }
            let Some(handler) = self.handler(route) else {
                continue;
            };
            if let Err(source) = handler.handle(record) {
                errors.push(RouteError {
                    route,
                    address: record.source_address.clone(),
                    source,
                });
            }
        }

        errors
    }
}

impl Default for Router<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Router<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("motion", &self.motion.is_some())
            .field("illuminance", &self.illuminance.is_some())
            .field("update", &self.update.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::FieldKind::{Battery, Illuminance, Motion, PacketId};
    use crate::test_utils::{admitted, payload};
    use std::cell::RefCell;

    fn recording<'a>(calls: &'a RefCell<Vec<Route>>, route: Route) -> impl Handler + 'a {
        move |_: &AdmittedRecord| -> Result<(), HandlerError> {
            calls.borrow_mut().push(route);
            Ok(())
        }
    }

    fn failing(_: &AdmittedRecord) -> Result<(), HandlerError> {
        Err(HandlerError::Actuator("switch offline".to_string()))
    }

    #[test]
    fn test_dispatch_order_with_all_fields() {
        let calls = RefCell::new(Vec::new());
        let mut router = Router::new()
            .on_update(recording(&calls, Route::Update))
            .on_illuminance(recording(&calls, Route::Illuminance))
            .on_motion(recording(&calls, Route::Motion));

        let record = admitted(&payload(&[(PacketId, 1.0), (Illuminance, 5.0), (Motion, 1.0)]));
        assert!(router.dispatch(&record).is_empty());
        assert_eq!(
            *calls.borrow(),
            [Route::Motion, Route::Illuminance, Route::Update]
        );
    }

    #[test]
    fn test_dispatch_only_present_fields() {
        let calls = RefCell::new(Vec::new());
        let mut router = Router::new()
            .on_motion(recording(&calls, Route::Motion))
            .on_illuminance(recording(&calls, Route::Illuminance))
            .on_update(recording(&calls, Route::Update));

        router.dispatch(&admitted(&payload(&[(Illuminance, 5.0)])));
        assert_eq!(*calls.borrow(), [Route::Illuminance, Route::Update]);

        calls.borrow_mut().clear();
        router.dispatch(&admitted(&payload(&[(Battery, 90.0)])));
        assert_eq!(*calls.borrow(), [Route::Update]);
    }

    #[test]
    fn test_motion_cleared_still_routed() {
        let calls = RefCell::new(Vec::new());
        let mut router = Router::new().on_motion(recording(&calls, Route::Motion));
        router.dispatch(&admitted(&payload(&[(Motion, 0.0)])));
        assert_eq!(*calls.borrow(), [Route::Motion]);
    }

    #[test]
    fn test_empty_record_goes_to_update_only() {
        let calls = RefCell::new(Vec::new());
        let mut router = Router::new()
            .on_motion(recording(&calls, Route::Motion))
            .on_update(recording(&calls, Route::Update));
        router.dispatch(&admitted(&[0x40]));
        assert_eq!(*calls.borrow(), [Route::Update]);
    }

    #[test]
    fn test_missing_handlers_are_skipped() {
        let calls = RefCell::new(Vec::new());
        let mut router = Router::new().on_update(recording(&calls, Route::Update));
        let record = admitted(&payload(&[(Motion, 1.0), (Illuminance, 1.0)]));
        assert!(router.dispatch(&record).is_empty());
        assert_eq!(*calls.borrow(), [Route::Update]);

        let mut empty = Router::new();
        assert!(empty.dispatch(&record).is_empty());
    }

    #[test]
    fn test_failing_handler_does_not_suppress_others() {
        let calls = RefCell::new(Vec::new());
        let mut router = Router::new()
            .on_motion(failing)
            .on_illuminance(recording(&calls, Route::Illuminance))
            .on_update(recording(&calls, Route::Update));

        let record = admitted(&payload(&[(Motion, 1.0), (Illuminance, 1.0)]));
        let errors = router.dispatch(&record);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].route, Route::Motion);
        assert_eq!(
            errors[0].to_string(),
            "motion handler failed for B0:C7:DE:3B:29:15: actuator error: switch offline"
        );
        assert_eq!(*calls.borrow(), [Route::Illuminance, Route::Update]);
    }

    #[test]
    fn test_router_debug() {
        let router = Router::new().on_update(failing);
        assert_eq!(
            format!("{router:?}"),
            "Router { motion: false, illuminance: false, update: true }"
        );
    }
}
