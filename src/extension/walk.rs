//! Frame-tree traversal.
//!
//! One traversal serves the probe, the deep mute toggle, and recursive
//! detach: visit the document, then every same-origin nested frame, depth
//! first. Cross-origin frames and frames whose content turns out to be a
//! top-level document contribute nothing.

use std::ops::ControlFlow;

use crate::host::Document;

/// Visits `root` and every reachable same-origin descendant frame document.
///
/// The visitor may break to stop the walk early.
pub(crate) fn visit_documents(
    root: &Document,
    visit: &mut dyn FnMut(&Document) -> ControlFlow<()>,
) -> ControlFlow<()> {
    visit(root)?;
    for frame in root.frames() {
        // Cross-origin access failure: the subtree is unreachable, not fatal.
        let Ok(child) = frame.content_document() else {
            continue;
        };
        // Genuine nested frames only.
        if child.is_top() || child.is_dead() {
            continue;
        }
        visit_documents(&child, visit)?;
    }
    ControlFlow::Continue(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::host::{FrameElement, Host};

    #[test]
    fn test_walk_is_depth_first_and_skips_cross_origin() {
        let host = Host::new();
        let top = host.new_document();
        let child = host.new_document();
        let grandchild = host.new_document();

        child.append_frame(FrameElement::same_origin(grandchild.clone()));
        top.append_frame(FrameElement::same_origin(child.clone()));
        top.append_frame(FrameElement::cross_origin());

        let mut seen = Vec::new();
        let _ = visit_documents(&top, &mut |doc| {
            seen.push(doc.id());
            ControlFlow::Continue(())
        });

        assert_eq!(seen, vec![top.id(), child.id(), grandchild.id()]);
    }

    #[test]
    fn test_walk_breaks_early() {
        let host = Host::new();
        let top = host.new_document();
        let child = host.new_document();
        top.append_frame(FrameElement::same_origin(child));

        let mut visits = 0;
        let flow = visit_documents(&top, &mut |_doc| {
            visits += 1;
            ControlFlow::Break(())
        });

        assert_eq!(visits, 1);
        assert!(flow.is_break());
    }

    #[test]
    fn test_walk_skips_dead_frames() {
        let host = Host::new();
        let top = host.new_document();
        let child = host.new_document();
        let frame = FrameElement::same_origin(child.clone());
        top.append_frame(frame);
        child.mark_dead();

        let mut seen = Vec::new();
        let _ = visit_documents(&top, &mut |doc| {
            seen.push(doc.id());
            ControlFlow::Continue(())
        });
        assert_eq!(seen, vec![top.id()]);
    }
}
