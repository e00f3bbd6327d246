use sidetree_jws::{JwkVerifier, SignatureVerifier};

use crate::{
    admit, chain::schema_rejection, resolve_document, schema, Admission, CasOutcome, ChainState,
    ChainStore, DIDSuffix, DocumentState, ProcessError, Protocol, Rejection,
};

/// Admits operations into the chains of a [`ChainStore`].
///
/// Every call loads the target chain, validates the operation against it and
/// writes the new state back with compare-and-swap. A lost race reloads the
/// chain and validates again, so the operation is judged against the state
/// it is actually appended to.
pub struct OperationProcessor<S, V = JwkVerifier> {
    protocol: Protocol,
    store: S,
    verifier: V,
}

impl<S: ChainStore> OperationProcessor<S> {
    pub fn new(protocol: Protocol, store: S) -> Self {
        Self::with_verifier(protocol, store, JwkVerifier)
    }
}

impl<S: ChainStore, V: SignatureVerifier> OperationProcessor<S, V> {
    pub fn with_verifier(protocol: Protocol, store: S, verifier: V) -> Self {
        Self {
            protocol,
            store,
            verifier,
        }
    }

    pub fn protocol(&self) -> &Protocol {
        &self.protocol
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate a raw operation request and append it to its chain.
    pub fn process(&self, raw: &[u8]) -> Result<Admission, ProcessError> {
        let request =
            schema::validate(&self.protocol, raw).map_err(|error| schema_rejection(raw, error))?;
        let did_suffix = request.did_suffix(&self.protocol).map_err(|error| Rejection {
            did_suffix: None,
            operation_type: Some(request.operation_type()),
            operation_hash: None,
            error: error.into(),
        })?;
        let attempts = self.protocol.parameters().max_store_retries.max(1);
        for attempt in 1..=attempts {
            let (version, state) = self.load(&did_suffix)?;
            let admission = admit(&self.protocol, &self.verifier, &state, request.clone())?;
            match self
                .store
                .compare_and_swap(&did_suffix, version, admission.state.clone())
                .map_err(|e| ProcessError::Store(Box::new(e)))?
            {
                CasOutcome::Committed(version) => {
                    log::trace!("stored {did_suffix} at version {version}");
                    return Ok(admission);
                }
                CasOutcome::Conflict => {
                    log::debug!("conflicting write to {did_suffix} (attempt {attempt}/{attempts})")
                }
            }
        }
        log::warn!("gave up writing {did_suffix} after {attempts} conflicting attempts");
        Err(ProcessError::RetriesExhausted {
            did_suffix,
            attempts,
        })
    }

    /// Current chain state of a suffix. Uninitialized if nothing was stored.
    pub fn chain_state(&self, did_suffix: &DIDSuffix) -> Result<ChainState, ProcessError> {
        self.load(did_suffix).map(|(_, state)| state)
    }

    /// Resolved document of a suffix.
    pub fn resolve(&self, did_suffix: &DIDSuffix) -> Result<DocumentState, ProcessError> {
        self.chain_state(did_suffix)
            .map(|state| resolve_document(&state))
    }

    fn load(&self, did_suffix: &DIDSuffix) -> Result<(Option<u64>, ChainState), ProcessError> {
        let record = self
            .store
            .get(did_suffix)
            .map_err(|e| ProcessError::Store(Box::new(e)))?;
        let (version, state) = match record {
            Some(record) => (Some(record.version), record.state),
            None => (None, ChainState::default()),
        };
        state
            .check_integrity(did_suffix)
            .map_err(|reason| {
                log::error!("corrupt chain record for {did_suffix}: {reason}");
                ProcessError::CorruptRecord {
                    did_suffix: did_suffix.clone(),
                    reason,
                }
            })?;
        Ok((version, state))
    }
}
