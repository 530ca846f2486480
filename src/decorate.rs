use crate::layout::{Decoration, LayoutNode};
use crate::style::{BlockStyle, EdgeAccessories, Insets};

/// Wrap `node` with the accessories, box styling and margins of `style`.
///
/// Each layer is added only when the style asks for it, innermost first:
/// accessories, then the padded/painted box, then margins. Margins get their own
/// unpainted wrapper so the background never extends into them.
pub fn decorate(node: Option<LayoutNode>, style: Option<&BlockStyle>) -> Option<LayoutNode> {
    let mut node = node?;
    let Some(style) = style else {
        return Some(node);
    };

    if !style.accessories.is_empty() {
        node = with_accessories(node, &style.accessories);
    }

    if style.has_box() {
        node = LayoutNode::decorated(
            node,
            Decoration {
                inset: style.padding.unwrap_or(Insets::ZERO),
                background: style.background,
                corner_radius: style.corner_radius,
                border: style.border,
            },
        );
    }

    if let Some(margin) = style.margin {
        node = LayoutNode::decorated(
            node,
            Decoration {
                inset: margin,
                ..Decoration::default()
            },
        );
    }

    Some(node)
}

fn with_accessories(node: LayoutNode, accessories: &EdgeAccessories) -> LayoutNode {
    let middle = if accessories.left.is_some() || accessories.right.is_some() {
        let row = [accessories.left.clone(), Some(node), accessories.right.clone()];
        LayoutNode::horizontal(row.into_iter().flatten().collect(), 0.0)
    } else {
        node
    };

    let column = [accessories.top.clone(), Some(middle), accessories.bottom.clone()];
    LayoutNode::vertical(column.into_iter().flatten().collect())
}
