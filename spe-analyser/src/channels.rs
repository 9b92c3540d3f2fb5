//! Resolution of raw channel numbers to detector types and calibration slots.
use crate::loader::{LoadError, load_json};
use pmt_gain_common::{Channel, SlotIndex};
use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};
use tracing::info;

/// Detector types whose channels are never given a calibration slot.
const EXCLUDED_PD_TYPE_PREFIX: &str = "xarapuca";

/// Looks up what is attached to a readout channel.
pub(crate) trait ChannelMap {
    fn pd_type(&self, channel: Channel) -> Option<&str>;

    fn electronics(&self, channel: Channel) -> Option<&str>;

    /// Every known channel, in ascending order.
    fn channels(&self) -> Vec<Channel>;
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub(crate) struct ChannelInfo {
    pub(crate) channel: Channel,
    pub(crate) pd_type: String,
    pub(crate) electronics: String,
}

/// A channel map read from a list of [ChannelInfo] records.
#[derive(Default, Debug, Clone)]
pub(crate) struct ChannelTable(BTreeMap<Channel, ChannelInfo>);

impl ChannelTable {
    pub(crate) fn load(path: &Path) -> Result<Self, LoadError> {
        let infos: Vec<ChannelInfo> = load_json(path)?;
        info!("Loaded {} channels from {}", infos.len(), path.display());
        Ok(infos.into_iter().collect())
    }
}

impl FromIterator<ChannelInfo> for ChannelTable {
    fn from_iter<T: IntoIterator<Item = ChannelInfo>>(iter: T) -> Self {
        Self(iter.into_iter().map(|info| (info.channel, info)).collect())
    }
}

impl ChannelMap for ChannelTable {
    fn pd_type(&self, channel: Channel) -> Option<&str> {
        self.0.get(&channel).map(|info| info.pd_type.as_str())
    }

    fn electronics(&self, channel: Channel) -> Option<&str> {
        self.0.get(&channel).map(|info| info.electronics.as_str())
    }

    fn channels(&self) -> Vec<Channel> {
        self.0.keys().copied().collect()
    }
}

/// Which PMTs are given a calibration slot.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PmtSelection<'a> {
    All,
    /// Ordinals of the selected PMTs, counting only PMT channels in ascending channel order.
    Ordinals(&'a [usize]),
}

/// Maps tracked channels to their calibration slot.
/// Slots are numbered in ascending channel order.
#[derive(Default, Debug, Clone)]
pub(crate) struct SlotTable {
    channels: Vec<Channel>,
}

impl SlotTable {
    pub(crate) fn from_selection<M: ChannelMap>(map: &M, selection: &PmtSelection) -> Self {
        let channels: Vec<Channel> = map
            .channels()
            .into_iter()
            .filter(|&channel| {
                map.pd_type(channel)
                    .is_some_and(|pd_type| !pd_type.starts_with(EXCLUDED_PD_TYPE_PREFIX))
            })
            .enumerate()
            .filter(|(ordinal, _)| match selection {
                PmtSelection::All => true,
                PmtSelection::Ordinals(ordinals) => ordinals.contains(ordinal),
            })
            .map(|(_, channel)| channel)
            .collect();
        info!("Tracking {} channels", channels.len());
        Self { channels }
    }

    pub(crate) fn slot(&self, channel: Channel) -> Option<SlotIndex> {
        self.channels.binary_search(&channel).ok()
    }

    pub(crate) fn channels(&self) -> &[Channel] {
        &self.channels
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn test_table() -> ChannelTable {
        [
            (6, "pmt_coated", "caen"),
            (7, "pmt_uncoated", "caen"),
            (8, "xarapuca_vuv", "daphne"),
            (9, "xarapuca_vis", "daphne"),
            (10, "pmt_coated", "caen"),
            (4, "pmt_coated", "caen"),
        ]
        .into_iter()
        .map(|(channel, pd_type, electronics)| ChannelInfo {
            channel,
            pd_type: pd_type.to_owned(),
            electronics: electronics.to_owned(),
        })
        .collect()
    }

    #[test]
    fn lookups() {
        let table = test_table();
        assert_eq!(table.pd_type(7), Some("pmt_uncoated"));
        assert_eq!(table.electronics(8), Some("daphne"));
        assert_eq!(table.pd_type(100), None);
        assert_eq!(table.channels(), vec![4, 6, 7, 8, 9, 10]);
    }

    #[test]
    fn all_pmts_skip_xarapucas() {
        let slots = SlotTable::from_selection(&test_table(), &PmtSelection::All);
        assert_eq!(slots.channels(), &[4, 6, 7, 10]);
        assert_eq!(slots.slot(4), Some(0));
        assert_eq!(slots.slot(10), Some(3));
        assert_eq!(slots.slot(8), None);
        assert_eq!(slots.slot(5), None);
    }

    #[test]
    fn selected_ordinals() {
        let slots = SlotTable::from_selection(&test_table(), &PmtSelection::Ordinals(&[1, 3]));
        assert_eq!(slots.channels(), &[6, 10]);
        assert_eq!(slots.slot(6), Some(0));
        assert_eq!(slots.slot(10), Some(1));
        assert_eq!(slots.slot(4), None);
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join("spe_analyser_channel_map_test.json");
        std::fs::write(
            &path,
            r#"[{"channel": 3, "pd_type": "pmt_coated", "electronics": "caen"}]"#,
        )
        .expect("write");
        let table = ChannelTable::load(&path).expect("load");
        assert_eq!(table.electronics(3), Some("caen"));
        std::fs::remove_file(path).ok();
    }
}
