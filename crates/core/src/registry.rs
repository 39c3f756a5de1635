//! Failure-to-handler dispatch table.
//!
//! A table is built from three sources, later ones replacing earlier keys:
//! the built-in generic and validation handlers, one generated handler per
//! listed [`ErrorKind`], and caller-supplied overrides. Lookups fall back from
//! a structured kind to [`ErrorKind::BASE`] and finally to the generic
//! handler, which is always present.

use std::{collections::HashMap, fmt, sync::Arc};

use metrics::counter;

use crate::{
    context::RequestContext,
    errors::{ErrorClass, ErrorKind, Failure},
};

pub type Handler<R> = Arc<dyn Fn(&Failure, &RequestContext) -> R + Send + Sync>;

/// Source of the built-in handlers for a response type `R`.
pub trait HandlerDefaults<R> {
    fn generic(&self) -> Handler<R>;

    fn validation(&self) -> Handler<R>;

    /// Handler generated for a registered structured-error kind.
    fn structured(&self, kind: ErrorKind) -> Handler<R>;
}

pub struct HandlerTable<R> {
    handlers: HashMap<ErrorClass, Handler<R>>,
}

impl<R> HandlerTable<R> {
    pub fn build<D>(
        defaults: &D,
        error_kinds: &[ErrorKind],
        validation_override: Option<Handler<R>>,
        extra_handlers: HashMap<ErrorClass, Handler<R>>,
    ) -> Self
    where
        D: HandlerDefaults<R> + ?Sized,
    {
        let mut handlers = HashMap::new();
        handlers.insert(
            ErrorClass::Validation,
            validation_override.unwrap_or_else(|| defaults.validation()),
        );
        handlers.insert(ErrorClass::Unhandled, defaults.generic());

        for kind in error_kinds {
            handlers.insert(ErrorClass::Structured(*kind), defaults.structured(*kind));
        }
        handlers.extend(extra_handlers);

        Self { handlers }
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    pub fn contains(&self, class: ErrorClass) -> bool {
        self.handlers.contains_key(&class)
    }

    pub fn classes(&self) -> impl Iterator<Item = ErrorClass> + '_ {
        self.handlers.keys().copied()
    }

    /// Exact handler, else the nearest registered ancestor.
    pub fn resolve(&self, class: ErrorClass) -> Option<&Handler<R>> {
        self.handlers
            .get(&class)
            .or_else(|| match class {
                ErrorClass::Structured(kind) if kind != ErrorKind::BASE => self
                    .handlers
                    .get(&ErrorClass::Structured(ErrorKind::BASE)),
                _ => None,
            })
            .or_else(|| self.handlers.get(&ErrorClass::Unhandled))
    }

    /// Runs the handler for `failure`. `None` only for a table without a
    /// generic handler, which `build` never produces.
    pub fn dispatch(&self, failure: &Failure, ctx: &RequestContext) -> Option<R> {
        let class = failure.class();
        let handler = self.resolve(class)?;
        counter!("jetpack_failures_handled_total", "class" => class.label()).increment(1);
        Some(handler(failure, ctx))
    }
}

impl<R> Clone for HandlerTable<R> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<R> fmt::Debug for HandlerTable<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerTable")
            .field("classes", &self.handlers.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::{ServiceError, ValidationError};

    const NOT_FOUND: ErrorKind = ErrorKind::new("NotFoundError");
    const VALUE_ERROR: ErrorKind = ErrorKind::new("ValueError");
    const CONFLICT: ErrorKind = ErrorKind::new("ConflictError");

    struct Labels;

    impl HandlerDefaults<String> for Labels {
        fn generic(&self) -> Handler<String> {
            Arc::new(|_: &Failure, _: &RequestContext| "generic".to_string())
        }

        fn validation(&self) -> Handler<String> {
            Arc::new(|_: &Failure, _: &RequestContext| "validation".to_string())
        }

        fn structured(&self, kind: ErrorKind) -> Handler<String> {
            Arc::new(move |failure: &Failure, _: &RequestContext| match failure {
                Failure::Structured(err) => format!("{kind}:{}", err.status_code()),
                _ => format!("{kind}:mismatch"),
            })
        }
    }

    fn fixed(label: &'static str) -> Handler<String> {
        Arc::new(move |_: &Failure, _: &RequestContext| label.to_string())
    }

    fn run(table: &HandlerTable<String>, failure: Failure) -> String {
        table
            .dispatch(&failure, &RequestContext::detached())
            .expect("generic handler always present")
    }

    #[test]
    fn defaults_only_cover_generic_and_validation() {
        let table = HandlerTable::build(&Labels, &[], None, HashMap::new());
        assert_eq!(table.len(), 2);
        assert!(table.contains(ErrorClass::Unhandled));
        assert!(table.contains(ErrorClass::Validation));

        assert_eq!(run(&table, ValidationError::default().into()), "validation");
        assert_eq!(run(&table, Failure::unhandled("boom")), "generic");
    }

    #[test]
    fn listed_kinds_get_generated_handlers() {
        let table = HandlerTable::build(&Labels, &[NOT_FOUND, CONFLICT], None, HashMap::new());
        assert_eq!(table.len(), 4);

        let failure = ServiceError::new("missing").of_kind(NOT_FOUND).with_status(404);
        assert_eq!(run(&table, failure.into()), "NotFoundError:404");

        let failure = ServiceError::new("dup").of_kind(CONFLICT).with_status(409);
        assert_eq!(run(&table, failure.into()), "ConflictError:409");
    }

    #[test]
    fn unregistered_kinds_fall_back_to_base_then_generic() {
        let table = HandlerTable::build(&Labels, &[], None, HashMap::new());
        let failure = ServiceError::new("x").of_kind(NOT_FOUND);
        assert_eq!(run(&table, failure.clone().into()), "generic");

        let table = HandlerTable::build(&Labels, &[ErrorKind::BASE], None, HashMap::new());
        assert_eq!(run(&table, failure.into()), "ServiceError:500");
    }

    #[test]
    fn validation_override_replaces_default() {
        let table = HandlerTable::build(&Labels, &[], Some(fixed("custom-validation")), HashMap::new());
        assert_eq!(
            run(&table, ValidationError::default().into()),
            "custom-validation"
        );
    }

    #[test]
    fn extra_handlers_take_precedence() {
        let mut extra = HashMap::new();
        extra.insert(ErrorClass::Structured(VALUE_ERROR), fixed("H"));
        extra.insert(ErrorClass::Unhandled, fixed("custom-generic"));

        let table = HandlerTable::build(&Labels, &[VALUE_ERROR, NOT_FOUND], None, extra);

        let failure = ServiceError::new("bad value").of_kind(VALUE_ERROR);
        assert_eq!(run(&table, failure.into()), "H");
        assert_eq!(run(&table, Failure::unhandled("boom")), "custom-generic");

        let failure = ServiceError::new("missing").of_kind(NOT_FOUND).with_status(404);
        assert_eq!(run(&table, failure.into()), "NotFoundError:404");
    }

    #[test]
    fn classes_lists_every_key() {
        let table = HandlerTable::build(&Labels, &[NOT_FOUND], None, HashMap::new());
        let mut labels: Vec<_> = table.classes().map(ErrorClass::label).collect();
        labels.sort_unstable();
        assert_eq!(labels, ["NotFoundError", "unhandled", "validation"]);
    }
}
