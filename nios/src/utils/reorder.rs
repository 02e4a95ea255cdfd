//! Align list values returned by WAPI with the order used in the plan
//!
//! WAPI is free to return members of unordered lists (name servers, aliases,
//! forwarders) in any order. Terraform compares lists positionally, so the
//! API list is rearranged to follow the plan before it is stored.

use tfplug::types::Dynamic;

/// Move elements of `api` whose key matches a plan element into plan order.
/// Elements without a match follow in their API order.
pub fn align_by<T, K, F>(plan: &[T], api: Vec<T>, key: F) -> Vec<T>
where
    K: PartialEq,
    F: Fn(&T) -> Option<K>,
{
    let mut remaining: Vec<Option<T>> = api.into_iter().map(Some).collect();
    let mut aligned = Vec::with_capacity(remaining.len());

    for planned in plan {
        let Some(wanted) = key(planned) else {
            continue;
        };
        let found = remaining.iter_mut().find(|slot| {
            slot.as_ref()
                .and_then(&key)
                .is_some_and(|k| k == wanted)
        });
        if let Some(item) = found.and_then(Option::take) {
            aligned.push(item);
        }
    }

    aligned.extend(remaining.into_iter().flatten());
    aligned
}

fn field<'a>(item: &'a Dynamic, key: &str) -> Option<&'a Dynamic> {
    item.as_map().and_then(|m| m.get(key)).filter(|v| !v.is_null_or_unknown())
}

/// Align a list of objects on the value of attribute `key`
pub fn align_by_key(plan: &[Dynamic], api: Vec<Dynamic>, key: &str) -> Vec<Dynamic> {
    align_by(plan, api, |item| field(item, key).cloned())
}

/// Align a list of strings
pub fn align_strings(plan: &[Dynamic], api: Vec<Dynamic>) -> Vec<Dynamic> {
    align_by(plan, api, |item| item.as_str().map(str::to_string))
}
