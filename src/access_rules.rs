//  Copyright 2020 Two Sigma Investments, LP.
//
//  Licensed under the Apache License, Version 2.0 (the "License");
//  you may not use this file except in compliance with the License.
//  You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
//  Unless required by applicable law or agreed to in writing, software
//  distributed under the License is distributed on an "AS IS" BASIS,
//  WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
//  See the License for the specific language governing permissions and
//  limitations under the License.

//! `AccessRuleSynthesizer` (§4.6). Computes which MAC rules an app needs and
//! installs them through [`MacLabelSubsystem`]; it never decides policy
//! beyond what's described here, it only synthesizes the rule set.

use crate::collaborators::{MacLabelSubsystem, MacRule};
use crate::config::ConfigTxn;
use crate::consts::{CFG_NODE_BINDINGS, CFG_NODE_BINDING_APP, FRAMEWORK_LABEL, NUM_PERMISSIONS};

/// The seven non-empty subsets of `{r, w, x}`, in the original's order.
const PERMISSIONS: [&str; NUM_PERMISSIONS] = ["x", "w", "wx", "r", "rx", "rw", "rwx"];

/// Installs every MAC rule an app needs: one self-access rule per
/// permission subset, the app/framework pair, and one `rw` pair per
/// declared IPC binding.
pub fn install_access_rules(
    app_name: &str,
    mac: &mut dyn MacLabelSubsystem,
    cfg: &dyn ConfigTxn,
) -> anyhow::Result<()> {
    let app_label = mac.label_for(app_name);

    for perm in PERMISSIONS.iter() {
        let dir_label = mac.access_label_for(app_name, perm);
        mac.install_rule(&MacRule {
            subject_label: app_label.clone(),
            object_label: dir_label,
            perm: (*perm).to_string(),
        })?;
    }

    mac.install_rule(&MacRule {
        subject_label: FRAMEWORK_LABEL.to_string(),
        object_label: app_label.clone(),
        perm: "w".to_string(),
    })?;
    mac.install_rule(&MacRule {
        subject_label: app_label.clone(),
        object_label: FRAMEWORK_LABEL.to_string(),
        perm: "rw".to_string(),
    })?;

    for binding_app in bound_peer_apps(cfg) {
        let peer_label = mac.label_for(&binding_app);
        mac.install_rule(&MacRule {
            subject_label: app_label.clone(),
            object_label: peer_label.clone(),
            perm: "rw".to_string(),
        })?;
        mac.install_rule(&MacRule {
            subject_label: peer_label,
            object_label: app_label.clone(),
            perm: "rw".to_string(),
        })?;
    }

    Ok(())
}

fn bound_peer_apps(cfg: &dyn ConfigTxn) -> Vec<String> {
    let bindings = cfg.sub(CFG_NODE_BINDINGS);
    bindings
        .child_names("")
        .into_iter()
        .filter_map(|child| bindings.get_string(&format!("{}/{}", child, CFG_NODE_BINDING_APP)))
        .filter(|name| !name.is_empty())
        .collect()
}
