//! Sink attachment helpers

use std::cell::RefCell;
use std::rc::Rc;

use flowpath::blocks::{SinkReader, VectorSink};
use flowpath::{Engine, EngineGraphExt, FlowGraphController};

/// Readers of the sinks attached by the last build, in path order
pub type Readers = Rc<RefCell<Vec<SinkReader>>>;

/// After every build, hang a bounded vector sink off each enabled path's endpoint
pub fn attach_vector_sinks<E: Engine>(top: &mut FlowGraphController<E>, limit: usize) -> Readers {
    let readers: Readers = Rc::new(RefCell::new(Vec::new()));
    top.on_graph_built({
        let readers = readers.clone();
        move |graph, paths| {
            readers.borrow_mut().clear();
            for path in paths.iter().filter(|p| p.is_enabled()) {
                let Some(endpoint) = path.endpoint() else {
                    continue;
                };
                let (sink, reader) = VectorSink::new(limit);
                let (sink, _) = graph.add("vector_sink", sink)?;
                graph.connect(endpoint.block, endpoint.port, sink, 0)?;
                readers.borrow_mut().push(reader);
            }
            Ok(())
        }
    });
    readers
}

/// Drain every reader
pub fn collect(readers: &Readers) -> Vec<Vec<f32>> {
    readers.borrow_mut().iter_mut().map(|r| r.data()).collect()
}
