//! Ordered fallback chains: the first defined candidate wins.

/// Returns the first `Some` among `candidates`, in order.
pub fn first_defined<T>(candidates: impl IntoIterator<Item = Option<T>>) -> Option<T> {
    candidates.into_iter().flatten().next()
}

/// Like [`first_defined`], but also reports which source supplied the value.
pub fn first_defined_from<S, T>(
    candidates: impl IntoIterator<Item = (S, Option<T>)>,
) -> Option<(S, T)> {
    candidates
        .into_iter()
        .find_map(|(source, value)| value.map(|value| (source, value)))
}
