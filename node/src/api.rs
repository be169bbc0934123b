// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.
//
// Copyright (c) DUSK NETWORK. All rights reserved.

use jsonrpsee::{Methods, RpcModule};
use tracing::warn;

use crate::error::Error;

/// A namespace of JSON-RPC methods registered on the node.
#[derive(Clone, Debug)]
pub struct Api {
    pub namespace: String,
    pub methods: Methods,
    /// Only served by the authenticated endpoint.
    pub authenticated: bool,
}

impl Api {
    pub fn new(namespace: impl Into<String>, methods: impl Into<Methods>) -> Self {
        Self {
            namespace: namespace.into(),
            methods: methods.into(),
            authenticated: false,
        }
    }

    pub fn authenticated(mut self) -> Self {
        self.authenticated = true;
        self
    }
}

/// Methods served on an open (unauthenticated) transport.
///
/// Only unauthenticated namespaces listed in `modules` are mounted, an empty
/// list mounts them all. Modules nobody registered are reported.
pub(crate) fn open_methods(
    transport: &'static str,
    apis: &[Api],
    modules: &[String],
) -> Result<Methods, Error> {
    for module in modules {
        if !apis.iter().any(|api| &api.namespace == module) {
            warn!(
                event = "unavailable module",
                transport,
                module = %module,
            );
        }
    }

    let selected = apis.iter().filter(|api| {
        !api.authenticated
            && (modules.is_empty() || modules.contains(&api.namespace))
    });
    merge(selected)
}

/// Methods served on a trusted transport: every registered namespace.
pub(crate) fn all_methods(apis: &[Api]) -> Result<Methods, Error> {
    merge(apis.iter())
}

fn merge<'a>(apis: impl Iterator<Item = &'a Api>) -> Result<Methods, Error> {
    let mut module = RpcModule::new(());
    for api in apis {
        module.merge(api.methods.clone())?;
    }
    Ok(module.into())
}
