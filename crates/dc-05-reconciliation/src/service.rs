//! Reconciliation service: owns the chain, ledger and mempool and is the
//! only code that mutates the chain.
//!
//! ## Locking
//!
//! `chain` (RwLock) is always taken before `state` (Mutex). Neither is held
//! across an `.await`.

use std::sync::Arc;
use std::time::Duration;

use dc_02_chain_store::{ChainReader, ChainStore};
use dc_03_ledger::Ledger;
use dc_04_mempool::{Admission, MempoolError, TransactionPool};
use parking_lot::{Mutex, RwLock};
use shared_types::{genesis_prior_hash, Address, Block, Hash32, SharedBlock, Tag, Transaction};
use tracing::{debug, info, instrument, warn};

use crate::adapters::LedgerAccounts;
use crate::domain::{
    classify, reconcile_transactions, validate_block, Acceptance, AncestorSearch, ChainParams,
    CommitOutcome, Disposition, LedgerState, MergePlan, MinedOutcome, MiningJob, PoolStats,
    ReconcileError, Request, Result, Step,
};
use crate::ports::AncestorSource;

pub struct ReconciliationService {
    params: ChainParams,
    chain: RwLock<ChainStore>,
    state: Mutex<LedgerState>,
}

impl ReconciliationService {
    pub fn new(params: ChainParams, ledger: Ledger, pool: TransactionPool) -> Self {
        Self {
            params,
            chain: RwLock::new(ChainStore::new()),
            state: Mutex::new(LedgerState { ledger, pool }),
        }
    }

    pub fn params(&self) -> ChainParams {
        self.params
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn tip(&self) -> Option<(Tag, Hash32)> {
        self.chain.read().tip().map(|b| (b.height(), b.hash()))
    }

    pub fn chain_len(&self) -> usize {
        self.chain.read().len()
    }

    pub fn chain_hashes(&self) -> Vec<Hash32> {
        self.chain.read().hashes()
    }

    /// GET_HASH service.
    pub fn hash_at(&self, height: &Tag) -> Option<Hash32> {
        self.chain.read().hash_at(height)
    }

    /// GET_BLOCK service.
    pub fn block_at(&self, height: &Tag) -> Option<SharedBlock> {
        self.chain.read().block_at(height).cloned()
    }

    pub fn balance(&self, address: &Address) -> Option<Tag> {
        self.state.lock().ledger.balance(address)
    }

    pub fn pool_stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            active: state.pool.active_len(),
            in_flight: state.pool.in_flight_len(),
            settled: state.pool.settled_len(),
        }
    }

    // ---------------------------------------------------------------------
    // Transactions and mining
    // ---------------------------------------------------------------------

    /// Admit a peer transaction into the active pool.
    pub fn admit_transaction(&self, tx: Transaction) -> std::result::Result<Admission, MempoolError> {
        let mut state = self.state.lock();
        let LedgerState { ledger, pool } = &mut *state;
        pool.admit(tx, &LedgerAccounts(ledger))
    }

    /// Take a batch for the miner if the pool is full enough and idle.
    pub fn prepare_mining(&self) -> Option<MiningJob> {
        let chain = self.chain.read();
        let mut state = self.state.lock();
        if !state.pool.ready_to_mine() {
            return None;
        }
        let batch = state.pool.take_batch(self.params.txs_per_block).ok()?;
        Some(MiningJob {
            batch,
            prior_hash: chain.tip_hash().unwrap_or_else(genesis_prior_hash),
            height: chain.next_height(),
        })
    }

    /// Give a batch back without a block (miner gave up or shut down).
    pub fn return_batch(&self, batch_id: u64) -> bool {
        let mut state = self.state.lock();
        if state.pool.in_flight_id() == Some(batch_id) {
            state.pool.return_in_flight();
            true
        } else {
            false
        }
    }

    /// Apply a block this node mined, unless the tip or batch moved on.
    #[instrument(skip(self, block), fields(height = ?block.height()))]
    pub fn apply_mined_block(&self, batch_id: u64, block: Block) -> Result<MinedOutcome> {
        let mut chain = self.chain.write();
        let mut state = self.state.lock();
        let expected_prior = chain.tip_hash().unwrap_or_else(genesis_prior_hash);
        let current_batch = state.pool.in_flight_id() == Some(batch_id);
        if !current_batch
            || block.prior_hash() != expected_prior
            || block.height() != chain.next_height()
        {
            if current_batch {
                state.pool.return_in_flight();
            }
            info!("[dc-05] discarding stale mined block (batch {})", batch_id);
            return Ok(MinedOutcome::Discarded);
        }
        let block = Arc::new(block);
        chain.push(block.clone())?;
        let LedgerState { ledger, pool } = &mut *state;
        reconcile_transactions(std::slice::from_ref(&block), &[], ledger, pool);
        info!("[dc-05] mined block applied at {:?}", block.height());
        Ok(MinedOutcome::Applied(block))
    }

    // ---------------------------------------------------------------------
    // Incoming blocks
    // ---------------------------------------------------------------------

    /// Classify a peer block and apply it, start a search, or propagate.
    #[instrument(skip(self, block), fields(height = ?block.height()))]
    pub fn accept_new_block(&self, block: Block) -> Result<Acceptance> {
        validate_block(&block, &self.params)?;
        let block = Arc::new(block);
        let mut chain = self.chain.write();
        let disposition = classify(&*chain, &block);
        debug!("[dc-05] disposition {:?}", disposition);

        match disposition {
            Disposition::Genesis | Disposition::Extend => {
                chain.push(block.clone())?;
                Ok(Acceptance::Applied(self.settle(vec![block], Vec::new())))
            }
            Disposition::Replace => {
                let Some(old) = chain.pop() else {
                    return Err(ReconcileError::TipMoved);
                };
                if let Err(e) = chain.push(block.clone()) {
                    chain.push(old)?;
                    return Err(e.into());
                }
                info!("[dc-05] replaced tip at {:?}", block.height());
                Ok(Acceptance::Applied(self.settle(vec![block], vec![old])))
            }
            Disposition::DeepMerge => {
                let (search, step) = AncestorSearch::begin(&chain, block, self.params)?;
                match step {
                    Step::Complete => {
                        let outcome = self.commit_locked(&mut chain, search.into_plan())?;
                        Ok(Acceptance::Applied(outcome))
                    }
                    Step::Send(request) => Ok(Acceptance::Search(search, request)),
                }
            }
            Disposition::PropagateOnly => {
                let settled = self.state.lock().pool.settled_among(&block.transactions);
                debug!("[dc-05] stale block, {} settled txs to relay", settled.len());
                Ok(Acceptance::Propagate(settled))
            }
            Disposition::Duplicate | Disposition::KeepLocal => Ok(Acceptance::Ignored(disposition)),
        }
    }

    /// Feed a GET_HASH reply into an in-progress search.
    pub fn search_on_hash(&self, search: &mut AncestorSearch, hash: Hash32) -> Result<Step> {
        let chain = self.chain.read();
        search.on_hash(&chain, hash)
    }

    /// Rewrite the chain with a completed search.
    pub fn commit_search(&self, plan: MergePlan) -> Result<CommitOutcome> {
        let mut chain = self.chain.write();
        self.commit_locked(&mut chain, plan)
    }

    /// Run a whole search against one peer, waiting at most `round_timeout`
    /// for each reply. On any failure the chain is left untouched.
    pub async fn drive_search<S>(
        &self,
        mut search: AncestorSearch,
        mut step: Step,
        source: &mut S,
        round_timeout: Duration,
    ) -> Result<CommitOutcome>
    where
        S: AncestorSource + ?Sized,
    {
        loop {
            step = match step {
                Step::Complete => return self.commit_search(search.into_plan()),
                Step::Send(Request::GetHash(height)) => {
                    let hash = tokio::time::timeout(round_timeout, source.request_hash(height))
                        .await
                        .map_err(|_| ReconcileError::Timeout {
                            request: "GET_HASH",
                            height,
                        })??;
                    self.search_on_hash(&mut search, hash)?
                }
                Step::Send(Request::GetBlock(height)) => {
                    let block = tokio::time::timeout(round_timeout, source.request_block(height))
                        .await
                        .map_err(|_| ReconcileError::Timeout {
                            request: "GET_BLOCK",
                            height,
                        })??;
                    search.on_block(block)?
                }
            };
        }
    }

    fn commit_locked(&self, chain: &mut ChainStore, plan: MergePlan) -> Result<CommitOutcome> {
        if chain.tip_hash() != plan.base_tip {
            warn!("[dc-05] tip moved during search, dropping merge");
            return Err(ReconcileError::TipMoved);
        }
        let removed: Vec<SharedBlock> = match plan.ancestor {
            Some(height) => chain.blocks_above(&height).to_vec(),
            None => chain.iter().cloned().collect(),
        };
        for _ in &removed {
            chain.pop();
        }
        for (pushed, block) in plan.added.iter().enumerate() {
            if let Err(e) = chain.push(block.clone()) {
                for _ in 0..pushed {
                    chain.pop();
                }
                for old in &removed {
                    chain.push(old.clone())?;
                }
                return Err(e.into());
            }
        }
        info!(
            "[dc-05] merged: dropped {} blocks, adopted {} blocks, tip {:?}",
            removed.len(),
            plan.added.len(),
            chain.tip_height()
        );
        Ok(self.settle(plan.added, removed))
    }

    /// Called with the chain write lock held.
    fn settle(&self, added: Vec<SharedBlock>, removed: Vec<SharedBlock>) -> CommitOutcome {
        let mut state = self.state.lock();
        let preempted_batch = state.pool.in_flight_id();
        state.pool.return_in_flight();
        let LedgerState { ledger, pool } = &mut *state;
        reconcile_transactions(&added, &removed, ledger, pool);
        CommitOutcome {
            removed,
            added,
            preempted_batch,
        }
    }
}
