//! Handler ordering and mixin dispatch table.

use std::collections::HashMap;

use super::EsmtpHandler;

/// Pairwise ordering relation between two handlers.
///
/// Asks `a` about `b`'s keyword first; if `a` declares no relation, defers to
/// `b`'s (negated) assertion about `a`. Zero in both directions means the
/// registration order stands.
fn relation(a: &dyn EsmtpHandler, b: &dyn EsmtpHandler) -> i32 {
    let v = a.priority_over(b.handled_keyword());
    if v != 0 {
        v
    } else {
        -b.priority_over(a.handled_keyword())
    }
}

/// Stable priority sort of the handler set.
///
/// An explicit insertion sort: `slice::sort_by` may reject comparators that
/// are not total orders, while contradictory priority declarations must still
/// produce some deterministic order here. Sorting an already-sorted sequence
/// with consistent declarations leaves it untouched.
pub(crate) fn sort_handlers(handlers: &mut [Box<dyn EsmtpHandler>]) {
    for i in 1..handlers.len() {
        let mut j = i;
        while j > 0 && relation(handlers[j - 1].as_ref(), handlers[j].as_ref()) > 0 {
            handlers.swap(j - 1, j);
            j -= 1;
        }
    }
}

/// Builds the mixin dispatch table: method name to index of the first handler
/// (in registry order) exposing it.
pub(crate) fn mixin_table(handlers: &[Box<dyn EsmtpHandler>]) -> HashMap<String, usize> {
    let mut table = HashMap::new();
    for (index, handler) in handlers.iter().enumerate() {
        for method in handler.exposed_methods() {
            table.entry((*method).to_string()).or_insert(index);
        }
    }
    table
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::collections::HashMap as Priorities;

    struct FakeHandler {
        keyword: &'static str,
        priorities: Priorities<&'static str, i32>,
        methods: Vec<&'static str>,
    }

    impl FakeHandler {
        fn new(keyword: &'static str) -> Box<Self> {
            Box::new(Self {
                keyword,
                priorities: Priorities::new(),
                methods: Vec::new(),
            })
        }

        fn with_priority(keyword: &'static str, over: &'static str, v: i32) -> Box<Self> {
            let mut handler = Self::new(keyword);
            handler.priorities.insert(over, v);
            handler
        }
    }

    #[async_trait::async_trait]
    impl EsmtpHandler for FakeHandler {
        fn handled_keyword(&self) -> &str {
            self.keyword
        }

        fn priority_over(&self, keyword: &str) -> i32 {
            self.priorities.get(keyword).copied().unwrap_or(0)
        }

        fn exposed_methods(&self) -> &[&str] {
            &self.methods
        }
    }

    fn keywords(handlers: &[Box<dyn EsmtpHandler>]) -> Vec<&str> {
        handlers.iter().map(|h| h.handled_keyword()).collect()
    }

    #[test]
    fn deferred_assertion_reorders() {
        // AUTH declares nothing; STARTTLS asserts it precedes AUTH.
        let mut handlers: Vec<Box<dyn EsmtpHandler>> = vec![
            FakeHandler::new("AUTH"),
            FakeHandler::with_priority("STARTTLS", "AUTH", -1),
        ];
        sort_handlers(&mut handlers);
        assert_eq!(keywords(&handlers), vec!["STARTTLS", "AUTH"]);
    }

    #[test]
    fn direct_assertion_wins_over_fallback() {
        let mut handlers: Vec<Box<dyn EsmtpHandler>> = vec![
            FakeHandler::with_priority("AUTH", "SIZE", -1),
            FakeHandler::new("SIZE"),
        ];
        sort_handlers(&mut handlers);
        assert_eq!(keywords(&handlers), vec!["AUTH", "SIZE"]);
    }

    #[test]
    fn undeclared_relations_keep_registration_order() {
        let mut handlers: Vec<Box<dyn EsmtpHandler>> = vec![
            FakeHandler::new("AUTH"),
            FakeHandler::new("SIZE"),
            FakeHandler::new("STARTTLS"),
        ];
        sort_handlers(&mut handlers);
        assert_eq!(keywords(&handlers), vec!["AUTH", "SIZE", "STARTTLS"]);
    }

    #[test]
    fn resort_is_idempotent() {
        let mut handlers: Vec<Box<dyn EsmtpHandler>> = vec![
            FakeHandler::new("AUTH"),
            FakeHandler::with_priority("STARTTLS", "AUTH", -1),
            FakeHandler::new("SIZE"),
        ];
        sort_handlers(&mut handlers);
        let first = keywords(&handlers)
            .into_iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>();
        sort_handlers(&mut handlers);
        assert_eq!(keywords(&handlers), first);
    }

    #[test]
    fn first_exposing_handler_wins_mixin_slot() {
        let mut a = FakeHandler::new("AUTH");
        a.methods = vec!["set_username", "set_password"];
        let mut b = FakeHandler::new("SIZE");
        b.methods = vec!["set_username", "set_message_size"];
        let handlers: Vec<Box<dyn EsmtpHandler>> = vec![a, b];
        let table = mixin_table(&handlers);
        assert_eq!(table.get("set_username"), Some(&0));
        assert_eq!(table.get("set_password"), Some(&0));
        assert_eq!(table.get("set_message_size"), Some(&1));
        assert_eq!(table.get("unknown"), None);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        const KEYWORDS: [&str; 6] = ["AUTH", "STARTTLS", "SIZE", "DSN", "PIPELINING", "SMTPUTF8"];

        /// Handler whose relations derive from a single global rank, so every
        /// declared relation is mutually consistent.
        struct RankedHandler {
            keyword: &'static str,
            rank: usize,
            ranks: Priorities<&'static str, usize>,
        }

        #[async_trait::async_trait]
        impl EsmtpHandler for RankedHandler {
            fn handled_keyword(&self) -> &str {
                self.keyword
            }

            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            fn priority_over(&self, keyword: &str) -> i32 {
                self.ranks
                    .get(keyword)
                    .map_or(0, |other| self.rank as i32 - *other as i32)
            }
        }

        proptest! {
            #[test]
            fn sort_preserves_the_handler_set(
                perm in Just((0..KEYWORDS.len()).collect::<Vec<usize>>()).prop_shuffle(),
            ) {
                let ranks: Priorities<&'static str, usize> =
                    KEYWORDS.iter().enumerate().map(|(rank, kw)| (*kw, rank)).collect();
                let mut handlers: Vec<Box<dyn EsmtpHandler>> = perm
                    .iter()
                    .map(|&i| {
                        Box::new(RankedHandler {
                            keyword: KEYWORDS[i],
                            rank: i,
                            ranks: ranks.clone(),
                        }) as Box<dyn EsmtpHandler>
                    })
                    .collect();

                sort_handlers(&mut handlers);

                // Consistent global ranks sort into rank order regardless of
                // registration order, and the set is preserved.
                prop_assert_eq!(keywords(&handlers), KEYWORDS.to_vec());

                // Idempotence.
                sort_handlers(&mut handlers);
                prop_assert_eq!(keywords(&handlers), KEYWORDS.to_vec());
            }
        }
    }
}
