use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// map of option name -> command line flag fragment
pub type OptionMap = BTreeMap<String, String>;

/// largest number of options combined into a single generated setting
pub const MAX_COMBINATION_SIZE: usize = 2;

/// A labeled set of flags handed to the timing tool
#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq, Hash)]
#[serde(deny_unknown_fields)]
pub struct Setting {
    pub label: String,
    pub flags: String,
}

impl Setting {
    pub fn new(label: impl Into<String>, flags: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            flags: flags.into(),
        }
    }

    /// label joins the option names with `-`, flags join the fragments with `,`
    pub fn from_combination(combination: &[(&String, &String)]) -> Self {
        Self {
            label: combination.iter().map(|(name, _)| name).join("-"),
            flags: combination.iter().map(|(_, flag)| flag).join(","),
        }
    }
}

/// All combinations of one or two options, singles first, each group in key order
pub fn generate(options: &OptionMap) -> Vec<Setting> {
    (1..=MAX_COMBINATION_SIZE)
        .flat_map(|size| options.iter().combinations(size))
        .map(|combination| Setting::from_combination(&combination))
        .collect_vec()
}

/// Baseline configurations timed next to the generated settings
pub fn presets() -> Vec<Setting> {
    vec![
        Setting::new("O0", "--noRegAlloc"),
        Setting::new("O1", "-r 0"),
        Setting::new(
            "O2",
            "--killDeadCode --doConstOpts --doInlining --onlyPushOnce -r 5",
        ),
    ]
}

/// generated settings followed by `presets`
pub fn settings(options: &OptionMap, presets: &[Setting]) -> Vec<Setting> {
    generate(options)
        .into_iter()
        .chain(presets.iter().cloned())
        .collect_vec()
}
