use std::io::{self, Write};

use crate::frame::FrameRecord;

/// A completed call tree. Usually a single root; repaired traces may
/// end up with several.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TraceTree {
    pub roots: Vec<TreeNode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TreeNode {
    #[serde(flatten)]
    pub frame: FrameRecord,
    pub children: Vec<TreeNode>,
}

impl TraceTree {
    /// Rebuilds the nesting from records in pop order (children before their
    /// parent). Every pending node deeper than the incoming record is one of
    /// its children.
    pub fn from_records(records: &[FrameRecord]) -> Self {
        let mut pending: Vec<TreeNode> = vec![];
        for record in records {
            let split = pending
                .iter()
                .rposition(|node| node.frame.depth <= record.depth)
                .map_or(0, |index| index + 1);
            let children = pending.split_off(split);
            pending.push(TreeNode {
                frame: record.clone(),
                children,
            });
        }
        TraceTree { roots: pending }
    }

    pub fn write_json_line<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        serde_json::to_writer(&mut *writer, self)?;
        writeln!(writer)
    }
}
