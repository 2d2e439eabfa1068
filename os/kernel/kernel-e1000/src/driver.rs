use crate::buffer::{BufferPool, NetStack, PacketBuffer};
use crate::desc::{DescriptorRings, TxCommand, TxStatus};
use crate::error::TransmitError;
use crate::regs::{
    DeviceControl, DeviceRegister, InterruptMask, ReceiveAddressHigh, ReceiveControl, Register,
    RegisterBlock, TransmitControl, TransmitIpg,
};
use core::fmt;
use core::sync::atomic::{AtomicUsize, Ordering, fence};
use kernel_alloc::phys_mapper::PhysMapper;
use kernel_info::net::{
    QEMU_MAC, RX_HEADROOM, RX_RING_SIZE, TX_COLLISION_DISTANCE, TX_COLLISION_THRESHOLD, TX_IPG,
    TX_RING_SIZE,
};
use kernel_memory_addresses::PhysicalAddress;
use kernel_sync::{Hart, SpinLock};
use log::{debug, error, info, trace};

/// Settings programmed during [`E1000::init`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct E1000Config {
    /// Station address accepted by the unicast receive filter.
    pub mac: [u8; 6],
    /// `TCTL.CT`.
    pub collision_threshold: u8,
    /// `TCTL.COLD`, 10 bits.
    pub collision_distance: u16,
    /// `TIPG` as `(IPGT, IPGR1, IPGR2)`, 10 bits each.
    pub ipg: (u16, u16, u16),
}

impl Default for E1000Config {
    fn default() -> Self {
        Self {
            mac: QEMU_MAC,
            collision_threshold: TX_COLLISION_THRESHOLD,
            collision_distance: TX_COLLISION_DISTANCE,
            ipg: TX_IPG,
        }
    }
}

/// Point-in-time copy of the driver's counters.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct E1000Stats {
    pub tx_packets: usize,
    pub tx_bytes: usize,
    /// Transmits rejected because the tail slot was not retired.
    pub tx_ring_full: usize,
    /// Transmits rejected because the payload exceeded a descriptor.
    pub tx_oversized: usize,
    pub rx_packets: usize,
    pub rx_bytes: usize,
}

#[derive(Default)]
struct Counters {
    tx_packets: AtomicUsize,
    tx_bytes: AtomicUsize,
    tx_ring_full: AtomicUsize,
    tx_oversized: AtomicUsize,
    rx_packets: AtomicUsize,
    rx_bytes: AtomicUsize,
}

impl Counters {
    fn count(counter: &AtomicUsize, n: usize) {
        counter.fetch_add(n, Ordering::Relaxed);
    }

    fn snapshot(&self) -> E1000Stats {
        E1000Stats {
            tx_packets: self.tx_packets.load(Ordering::Relaxed),
            tx_bytes: self.tx_bytes.load(Ordering::Relaxed),
            tx_ring_full: self.tx_ring_full.load(Ordering::Relaxed),
            tx_oversized: self.tx_oversized.load(Ordering::Relaxed),
            rx_packets: self.rx_packets.load(Ordering::Relaxed),
            rx_bytes: self.rx_bytes.load(Ordering::Relaxed),
        }
    }
}

/// Everything the device lock protects.
struct Rings<B> {
    desc: &'static mut DescriptorRings,
    /// Buffer last posted at each transmit slot, freed on the slot's next use.
    tx: [Option<B>; TX_RING_SIZE],
    /// Buffer armed at each receive slot.
    rx: [Option<B>; RX_RING_SIZE],
}

/// Driver for one Intel 82540EM (e1000) NIC.
///
/// Register sequencing, both descriptor rings and the buffers parked in them
/// sit behind a single device lock, taken with interrupts disabled so
/// [`intr`](Self::intr) cannot deadlock against [`transmit`](Self::transmit)
/// on the same hart.
pub struct E1000<R, P: BufferPool, H> {
    regs: R,
    pool: P,
    hart: H,
    mac: [u8; 6],
    state: SpinLock<Rings<P::Buffer>>,
    counters: Counters,
}

impl<R, P, H> E1000<R, P, H>
where
    R: RegisterBlock,
    P: BufferPool,
    H: Hart,
{
    /// Resets the NIC and brings up both rings.
    ///
    /// `mapper` translates the ring memory to the physical addresses the NIC
    /// is given; every receive slot is armed with a buffer from `pool`.
    ///
    /// # Panics
    /// If `pool` cannot fill the receive ring.
    pub fn init<M: PhysMapper + ?Sized>(
        config: E1000Config,
        regs: R,
        pool: P,
        hart: H,
        rings: &'static mut DescriptorRings,
        mapper: &M,
    ) -> Self {
        InterruptMask::new().store(&regs);
        DeviceControl::load(&regs).with_rst(true).store(&regs);
        InterruptMask::new().store(&regs);
        fence(Ordering::SeqCst);

        *rings = DescriptorRings::new();

        for desc in &mut rings.tx {
            desc.set_status(TxStatus::new().with_dd(true));
        }
        let tx_base = mapper.ptr_to_phys((&raw const rings.tx).cast());
        program_base(&regs, Register::TDBAL, Register::TDBAH, tx_base);
        regs.write(Register::TDLEN, DescriptorRings::TX_BYTES);
        regs.write(Register::TDH, 0);
        regs.write(Register::TDT, 0);

        let rx = core::array::from_fn(|slot| {
            let Some(buf) = pool.alloc(RX_HEADROOM) else {
                error!("e1000: no buffer for receive slot {slot}");
                panic!("e1000: cannot fill the receive ring");
            };
            rings.rx[slot].arm(buf.dma_address());
            Some(buf)
        });
        let rx_base = mapper.ptr_to_phys((&raw const rings.rx).cast());
        program_base(&regs, Register::RDBAL, Register::RDBAH, rx_base);
        regs.write(Register::RDH, 0);
        regs.write(Register::RDT, slot_register(RX_RING_SIZE - 1));
        regs.write(Register::RDLEN, DescriptorRings::RX_BYTES);

        let (ral, rah) = ReceiveAddressHigh::split_mac(config.mac);
        regs.write(Register::RAL0, ral);
        rah.store(&regs);
        for word in 0..Register::MTA_LEN {
            regs.write(Register::MTA.at(word), 0);
        }

        let (ipgt, ipgr1, ipgr2) = config.ipg;
        TransmitControl::new()
            .with_en(true)
            .with_psp(true)
            .with_ct(config.collision_threshold)
            .with_cold(config.collision_distance)
            .store(&regs);
        TransmitIpg::new()
            .with_ipgt(ipgt)
            .with_ipgr1(ipgr1)
            .with_ipgr2(ipgr2)
            .store(&regs);

        ReceiveControl::new()
            .with_en(true)
            .with_bam(true)
            .with_bsize(ReceiveControl::BSIZE_2048)
            .with_secrc(true)
            .store(&regs);

        regs.write(Register::RDTR, 0);
        regs.write(Register::RADV, 0);

        InterruptMask::new().with_rxt0(true).store(&regs);

        info!(
            "e1000: up, mac {}, {TX_RING_SIZE} tx / {RX_RING_SIZE} rx descriptors",
            MacAddress(config.mac)
        );

        Self {
            regs,
            pool,
            hart,
            mac: config.mac,
            state: SpinLock::new(
                "e1000",
                Rings {
                    desc: rings,
                    tx: [const { None }; TX_RING_SIZE],
                    rx,
                },
            ),
            counters: Counters::default(),
        }
    }

    /// Posts `buf` at the transmit tail.
    ///
    /// The buffer previously posted in that slot is freed here, once the NIC
    /// has retired it.
    ///
    /// # Errors
    /// The buffer comes back inside the error if the tail slot is still owned
    /// by the NIC ([`TransmitError::RingFull`]) or the payload is longer than
    /// a descriptor can describe ([`TransmitError::Oversized`]).
    pub fn transmit(&self, buf: P::Buffer) -> Result<(), TransmitError<P::Buffer>> {
        let len = buf.len();
        let Ok(length) = u16::try_from(len) else {
            Counters::count(&self.counters.tx_oversized, 1);
            return Err(TransmitError::Oversized { len, buffer: buf });
        };

        let mut state = self.state.lock_irq(&self.hart);
        let Rings { desc, tx, .. } = &mut *state;

        let pos = self.regs.read(Register::TDT) as usize % TX_RING_SIZE;
        let slot = &mut desc.tx[pos];
        if !slot.status().dd() {
            debug!("e1000: transmit ring full at slot {pos}");
            Counters::count(&self.counters.tx_ring_full, 1);
            return Err(TransmitError::RingFull {
                slot: pos,
                buffer: buf,
            });
        }
        fence(Ordering::Acquire);

        if let Some(done) = tx[pos].take() {
            self.pool.free(done);
        }

        slot.post(
            buf.dma_address(),
            length,
            TxCommand::new().with_eop(true).with_rs(true),
        );
        tx[pos] = Some(buf);

        fence(Ordering::Release);
        self.regs
            .write(Register::TDT, slot_register((pos + 1) % TX_RING_SIZE));

        Counters::count(&self.counters.tx_packets, 1);
        Counters::count(&self.counters.tx_bytes, len);
        Ok(())
    }

    /// Acknowledges every pending interrupt cause, then drains the receive
    /// ring into `stack`.
    ///
    /// # Panics
    /// If a drained receive slot cannot be re-armed with a fresh buffer.
    pub fn intr<S: NetStack<P::Buffer> + ?Sized>(&self, stack: &S) {
        self.regs.write(Register::ICR, u32::MAX);
        self.recv(stack);
    }

    fn recv<S: NetStack<P::Buffer> + ?Sized>(&self, stack: &S) {
        let mut state = self.state.lock_irq(&self.hart);
        let mut delivered = 0usize;

        loop {
            let cur = (self.regs.read(Register::RDT) as usize + 1) % RX_RING_SIZE;
            if !state.desc.rx[cur].status().dd() {
                break;
            }
            fence(Ordering::Acquire);

            let Rings { desc, rx, .. } = &mut *state;
            let Some(mut buf) = rx[cur].take() else {
                panic!("e1000: receive slot {cur} completed without a buffer");
            };
            let mut len = usize::from(desc.rx[cur].length());
            if len > buf.capacity() {
                error!(
                    "e1000: receive slot {cur} reports {len} bytes, buffer holds {}",
                    buf.capacity()
                );
                len = buf.capacity();
            }
            // Hide the slot from a concurrent drain while the lock is dropped.
            desc.rx[cur].clear_status();
            buf.set_len(len);

            Counters::count(&self.counters.rx_packets, 1);
            Counters::count(&self.counters.rx_bytes, len);

            drop(state);
            stack.net_rx(buf);
            state = self.state.lock_irq(&self.hart);

            let Some(fresh) = self.pool.alloc(RX_HEADROOM) else {
                error!("e1000: out of buffers re-arming receive slot {cur}");
                panic!("e1000: cannot re-arm receive slot {cur}");
            };
            let Rings { desc, rx, .. } = &mut *state;
            desc.rx[cur].arm(fresh.dma_address());
            rx[cur] = Some(fresh);

            fence(Ordering::Release);
            self.regs.write(Register::RDT, slot_register(cur));
            delivered += 1;
        }

        if delivered > 0 {
            trace!("e1000: received {delivered} packets");
        }
    }

    #[must_use]
    pub fn stats(&self) -> E1000Stats {
        self.counters.snapshot()
    }

    #[must_use]
    pub const fn mac_address(&self) -> [u8; 6] {
        self.mac
    }

    #[must_use]
    pub const fn pool(&self) -> &P {
        &self.pool
    }
}

impl<R, P: BufferPool, H> fmt::Debug for E1000<R, P, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("E1000")
            .field("mac", &MacAddress(self.mac))
            .field("state", &self.state)
            .field("stats", &self.counters.snapshot())
            .finish_non_exhaustive()
    }
}

fn program_base<R: RegisterBlock>(regs: &R, low: Register, high: Register, base: PhysicalAddress) {
    regs.write(low, base.low_u32());
    regs.write(high, base.high_u32());
}

#[inline]
#[allow(clippy::cast_possible_truncation)]
const fn slot_register(slot: usize) -> u32 {
    slot as u32
}

/// `aa:bb:cc:dd:ee:ff` formatting.
struct MacAddress([u8; 6]);

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c, d, e, g] = self.0;
        write!(f, "{a:02x}:{b:02x}:{c:02x}:{d:02x}:{e:02x}:{g:02x}")
    }
}

impl fmt::Debug for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
