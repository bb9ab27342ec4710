use proptest::prelude::*;
use spark_observer::{observe_render, Graph, ObserverOptions, TestRenderer};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// However many writes a transaction makes, each subscribed component
    /// renders once afterwards and shows the final values.
    #[test]
    fn prop_one_render_per_transaction(
        writes in prop::collection::vec((0usize..3, -50i32..50), 1..24)
    ) {
        let graph = Graph::new();
        let boxes: Vec<_> = (0..3).map(|_| graph.observable(0)).collect();
        let renderer = TestRenderer::new();

        let watched = boxes.clone();
        let opts = ObserverOptions::new().with_graph(graph.handle());
        let id = renderer.render(move |cx| {
            observe_render(
                cx,
                || watched.iter().map(|b| b.get().to_string()).collect::<Vec<_>>().join(","),
                &opts,
            )
        });

        let mut expected = [0i32; 3];
        let mut changed = false;
        graph.transaction(|| {
            for &(index, value) in &writes {
                changed |= boxes[index].set(value);
                expected[index] = value;
            }
        });

        // A write that changed anything re-renders, even if a later write
        // restored the old value
        let expected_output = expected.iter().map(i32::to_string).collect::<Vec<_>>().join(",");

        prop_assert_eq!(renderer.output(id).unwrap(), expected_output);
        prop_assert_eq!(renderer.render_count(id).unwrap(), if changed { 2 } else { 1 });
    }
}
